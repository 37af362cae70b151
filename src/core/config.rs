//! Configuration records for segmentation and arbitration.
//!
//! Detection behavior is reproducible from inputs alone: every tuning knob
//! the pipeline consults lives in an explicit configuration record, and the
//! per-document-type presets are plain constants in
//! [`DetectionParams::for_document_type`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::DocumentType;

/// Geometric detection tuning for one segmentation run.
///
/// The defaults are balanced for mixed printed documents; use
/// [`DetectionParams::for_document_type`] for the per-type presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Minimum candidate area as a fraction of the page area.
    #[serde(default = "DetectionParams::default_min_area_ratio")]
    pub min_area_ratio: f32,

    /// Maximum candidate area as a fraction of the page area. Candidates
    /// above this are almost always the page frame itself.
    #[serde(default = "DetectionParams::default_max_area_ratio")]
    pub max_area_ratio: f32,

    /// Minimum candidate width in pixels.
    #[serde(default = "DetectionParams::default_min_width")]
    pub min_width: u32,

    /// Minimum candidate height in pixels.
    #[serde(default = "DetectionParams::default_min_height")]
    pub min_height: u32,

    /// Minimum width/height ratio for a candidate.
    #[serde(default = "DetectionParams::default_min_aspect_ratio")]
    pub min_aspect_ratio: f32,

    /// Maximum width/height ratio for a candidate.
    #[serde(default = "DetectionParams::default_max_aspect_ratio")]
    pub max_aspect_ratio: f32,

    /// Radius of the adaptive-threshold window used during binarization.
    #[serde(default = "DetectionParams::default_block_radius")]
    pub block_radius: u32,

    /// Largest horizontal run of background pixels bridged when joining
    /// characters into words.
    #[serde(default = "DetectionParams::default_horizontal_gap")]
    pub horizontal_gap: u32,

    /// Largest vertical run of background pixels bridged when joining lines
    /// into blocks.
    #[serde(default = "DetectionParams::default_vertical_gap")]
    pub vertical_gap: u32,

    /// Minimum ink density for a candidate to count as text rather than a
    /// blank frame.
    #[serde(default = "DetectionParams::default_min_density")]
    pub min_density: f32,

    /// Maximum ink density for a candidate to count as text rather than a
    /// solid fill.
    #[serde(default = "DetectionParams::default_max_density")]
    pub max_density: f32,

    /// Minimum intensity standard deviation for a candidate; uniform
    /// regions carry no text.
    #[serde(default = "DetectionParams::default_min_std_dev")]
    pub min_std_dev: f32,
}

impl DetectionParams {
    fn default_min_area_ratio() -> f32 {
        0.0005
    }
    fn default_max_area_ratio() -> f32 {
        0.5
    }
    fn default_min_width() -> u32 {
        20
    }
    fn default_min_height() -> u32 {
        8
    }
    fn default_min_aspect_ratio() -> f32 {
        0.02
    }
    fn default_max_aspect_ratio() -> f32 {
        50.0
    }
    fn default_block_radius() -> u32 {
        7
    }
    fn default_horizontal_gap() -> u32 {
        15
    }
    fn default_vertical_gap() -> u32 {
        8
    }
    fn default_min_density() -> f32 {
        0.02
    }
    fn default_max_density() -> f32 {
        0.98
    }
    fn default_min_std_dev() -> f32 {
        5.0
    }

    /// Detection preset tuned to the expected layout density of a document
    /// type.
    ///
    /// Invoices and forms carry many small isolated fields, so the size
    /// minima shrink; periodicals constrain aspect ratios to column shapes;
    /// handwriting needs wider joining; tables must not fuse adjacent
    /// cells; photos raise the minima to keep sensor noise out.
    pub fn for_document_type(document_type: DocumentType) -> Self {
        let base = Self::default();
        match document_type {
            DocumentType::Invoice => Self {
                min_area_ratio: 0.0002,
                min_width: 12,
                min_height: 6,
                ..base
            },
            DocumentType::Form => Self {
                min_area_ratio: 0.0001,
                min_width: 10,
                min_height: 5,
                horizontal_gap: 10,
                ..base
            },
            DocumentType::Periodical => Self {
                min_aspect_ratio: 0.3,
                max_aspect_ratio: 15.0,
                vertical_gap: 12,
                ..base
            },
            DocumentType::Handwritten => Self {
                block_radius: 10,
                horizontal_gap: 20,
                ..base
            },
            DocumentType::Table => Self {
                min_aspect_ratio: 0.1,
                max_aspect_ratio: 20.0,
                horizontal_gap: 8,
                vertical_gap: 4,
                ..base
            },
            DocumentType::Photo => Self {
                min_area_ratio: 0.001,
                block_radius: 9,
                min_std_dev: 8.0,
                ..base
            },
            DocumentType::Default => base,
        }
    }
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            min_area_ratio: Self::default_min_area_ratio(),
            max_area_ratio: Self::default_max_area_ratio(),
            min_width: Self::default_min_width(),
            min_height: Self::default_min_height(),
            min_aspect_ratio: Self::default_min_aspect_ratio(),
            max_aspect_ratio: Self::default_max_aspect_ratio(),
            block_radius: Self::default_block_radius(),
            horizontal_gap: Self::default_horizontal_gap(),
            vertical_gap: Self::default_vertical_gap(),
            min_density: Self::default_min_density(),
            max_density: Self::default_max_density(),
            min_std_dev: Self::default_min_std_dev(),
        }
    }
}

/// Configuration for one segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Document-type hint used to pick the detection preset.
    #[serde(default)]
    pub document_type: DocumentType,

    /// Selects intelligent detection (classification + layout-aware
    /// reading order) over plain geometric detection.
    #[serde(default)]
    pub intelligent: bool,

    /// Geometric detection tuning.
    #[serde(default)]
    pub detection: DetectionParams,

    /// Two zones belong to the same row when their vertical spans overlap
    /// by more than this fraction of the smaller span.
    #[serde(default = "SegmenterConfig::default_row_overlap_ratio")]
    pub row_overlap_ratio: f32,

    /// Margin in pixels added around each zone when extracting its crop,
    /// clamped to the image bounds.
    #[serde(default = "SegmenterConfig::default_extraction_margin")]
    pub extraction_margin: u32,

    /// Two same-type zones merge when their center distance is below this
    /// fraction of their mean half-extent.
    #[serde(default = "SegmenterConfig::default_merge_distance_ratio")]
    pub merge_distance_ratio: f32,

    /// Two zones never merge when their confidences differ by more than
    /// this.
    #[serde(default = "SegmenterConfig::default_max_confidence_diff")]
    pub max_confidence_diff: f32,

    /// Confidence floor for the final validation pass. Only applied when a
    /// preview backend is configured, since without one the classifier has
    /// no OCR signal to score against.
    #[serde(default = "SegmenterConfig::default_min_confidence")]
    pub min_confidence: f32,

    /// Maximum length of `content_preview` in characters.
    #[serde(default = "SegmenterConfig::default_preview_len")]
    pub preview_len: usize,
}

impl SegmenterConfig {
    fn default_row_overlap_ratio() -> f32 {
        0.5
    }
    fn default_extraction_margin() -> u32 {
        10
    }
    fn default_merge_distance_ratio() -> f32 {
        0.8
    }
    fn default_max_confidence_diff() -> f32 {
        0.3
    }
    fn default_min_confidence() -> f32 {
        0.1
    }
    fn default_preview_len() -> usize {
        80
    }

    /// Classical (geometry-only) configuration for a document type.
    pub fn classical(document_type: DocumentType) -> Self {
        Self {
            document_type,
            intelligent: false,
            detection: DetectionParams::for_document_type(document_type),
            ..Self::default()
        }
    }

    /// Intelligent (classification + layout-aware order) configuration for
    /// a document type.
    pub fn intelligent(document_type: DocumentType) -> Self {
        Self {
            intelligent: true,
            ..Self::classical(document_type)
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            document_type: DocumentType::Default,
            intelligent: false,
            detection: DetectionParams::default(),
            row_overlap_ratio: Self::default_row_overlap_ratio(),
            extraction_margin: Self::default_extraction_margin(),
            merge_distance_ratio: Self::default_merge_distance_ratio(),
            max_confidence_diff: Self::default_max_confidence_diff(),
            min_confidence: Self::default_min_confidence(),
            preview_len: Self::default_preview_len(),
        }
    }
}

/// Configuration for the OCR arbitrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitratorConfig {
    /// Deadline for the whole backend fan-out. Backends still running when
    /// it expires are treated exactly like failed backends. `None` waits
    /// for every backend.
    #[serde(default)]
    pub timeout: Option<Duration>,
}
