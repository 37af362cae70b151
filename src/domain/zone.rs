//! Zone and segmentation result types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::processors::BoundingBox;

/// Semantic category assigned to a detected zone.
///
/// `Unknown` is the default and fallback, never an error: classical-mode
/// detection assigns it to every zone, and intelligent-mode classification
/// falls back to it when neither the text nor the geometry gives a signal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    /// Letterhead, document title or company block at the top of the page.
    Header,
    /// Amount, total or tax figure.
    Price,
    /// Date mention.
    Date,
    /// Postal address block.
    Address,
    /// Reference, order or client number.
    Reference,
    /// Running body text.
    Paragraph,
    /// Signature or stamp area.
    Signature,
    /// Page footer or legal mentions.
    Footer,
    /// No semantic type could be assigned.
    #[default]
    Unknown,
}

impl ZoneType {
    /// Stable lowercase name, also used in artifact filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Header => "header",
            ZoneType::Price => "price",
            ZoneType::Date => "date",
            ZoneType::Address => "address",
            ZoneType::Reference => "reference",
            ZoneType::Paragraph => "paragraph",
            ZoneType::Signature => "signature",
            ZoneType::Footer => "footer",
            ZoneType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document-type hint selecting a detection preset.
///
/// `Default` is a first-class value: the segmenter behaves identically
/// regardless of any caller-side gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Form,
    Periodical,
    Handwritten,
    Table,
    Photo,
    #[default]
    Default,
}

/// A rectangular region of a document image believed to contain one
/// coherent unit of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Unique within one segmentation run; 1-based detection order.
    pub id: u32,
    /// Position in source-image pixel space, always within image bounds.
    pub bbox: BoundingBox,
    /// Semantic type; `Unknown` in classical mode.
    pub zone_type: ZoneType,
    /// Classifier confidence in [0, 1] that `zone_type` is correct;
    /// 0.0 in classical mode, where no type is inferred.
    pub confidence: f32,
    /// Persisted pixel crop for this zone, set once the crop is written.
    /// Owned by the caller after the run; read-only to consumers.
    pub crop_path: Option<PathBuf>,
    /// Short text snippet used for display before full OCR runs.
    /// May be empty.
    pub content_preview: String,
}

/// Outcome of one segmentation run. Immutable after return; the caller
/// owns the persisted crops and annotated image and is responsible for
/// their cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    /// Detected zones in detection order (not reading order).
    pub zones: Vec<Zone>,
    /// Permutation of the ids in `zones`, in semantically correct
    /// traversal order.
    pub reading_order: Vec<u32>,
    /// Count of zones per type; always consistent with `zones`.
    pub zone_type_histogram: BTreeMap<ZoneType, usize>,
    /// Visualization artifact; derived, not authoritative.
    pub annotated_image_path: PathBuf,
    /// JSON sidecar describing the run.
    pub metadata_path: PathBuf,
}

impl SegmentationResult {
    pub(crate) fn new(
        zones: Vec<Zone>,
        reading_order: Vec<u32>,
        annotated_image_path: PathBuf,
        metadata_path: PathBuf,
    ) -> Self {
        let mut zone_type_histogram = BTreeMap::new();
        for zone in &zones {
            *zone_type_histogram.entry(zone.zone_type).or_insert(0) += 1;
        }
        Self {
            zones,
            reading_order,
            zone_type_histogram,
            annotated_image_path,
            metadata_path,
        }
    }

    /// Looks up a zone by id.
    pub fn zone(&self, id: u32) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    /// Zones in reading order.
    pub fn zones_in_reading_order(&self) -> impl Iterator<Item = &Zone> {
        self.reading_order.iter().filter_map(|id| self.zone(*id))
    }
}
