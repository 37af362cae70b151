//! The zone segmentation pipeline.
//!
//! One segmentation run walks a fixed stage sequence: binarization,
//! directional gap closing, component extraction, geometric filtering and a
//! texture check, then (in intelligent mode) semantic classification,
//! merging and validation, reading-order computation, and finally artifact
//! persistence. The returned [`SegmentationResult`] references every
//! artifact written on disk; a run that fails mid-persistence removes what
//! it already wrote.

pub mod classify;
pub mod visualization;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use image::imageops::crop_imm;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::arbiter::OcrBackend;
use crate::core::{OcrError, OcrResult, SegmenterConfig};
use crate::domain::{LineResult, SegmentationResult, Zone, ZoneType};
use crate::processors::binarize::{binarize, close_gaps};
use crate::processors::geometry::BoundingBox;
use crate::processors::reading_order::{layout_order, raster_order};
use crate::processors::regions::{
    component_boxes, filter_candidates, looks_like_text, merge_similar_zones,
};
use crate::utils::load_image;

pub use visualization::VisualizationConfig;

/// Crop persistence switches to parallel encoding above this zone count.
const PARALLEL_CROP_THRESHOLD: usize = 4;

/// Permissive area window for the final validation pass. Wider than the
/// detection window on purpose: merging may legitimately grow a zone past
/// the detection maximum.
const VALIDATION_MIN_AREA_RATIO: f32 = 0.0001;
const VALIDATION_MAX_AREA_RATIO: f32 = 0.9;

/// Partitions document images into typed zones with a reading order.
pub struct ZoneSegmenter {
    config: SegmenterConfig,
    preview_backend: Option<Arc<dyn OcrBackend>>,
    visualization: VisualizationConfig,
}

impl ZoneSegmenter {
    /// Creates a segmenter with the given configuration and no preview
    /// backend.
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            preview_backend: None,
            visualization: VisualizationConfig::default(),
        }
    }

    /// Attaches a backend used to read a short text preview out of each
    /// candidate zone during intelligent classification.
    pub fn with_preview_backend(mut self, backend: Arc<dyn OcrBackend>) -> Self {
        self.preview_backend = Some(backend);
        self
    }

    /// Replaces the visualization settings.
    pub fn with_visualization(mut self, visualization: VisualizationConfig) -> Self {
        self.visualization = visualization;
        self
    }

    /// Loads an image file and segments it, writing artifacts into
    /// `output_dir`.
    pub fn segment_file(&self, image_path: &Path, output_dir: &Path) -> OcrResult<SegmentationResult> {
        let stem = image_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                OcrError::invalid_input(format!(
                    "image path has no usable file stem: {}",
                    image_path.display()
                ))
            })?;
        let image = load_image(image_path)?;
        self.segment_image(&image, stem, output_dir)
    }

    /// Segments an in-memory image.
    ///
    /// `stem` names the artifacts (`{stem}_zone_NN_{type}.png`,
    /// `{stem}_annotated.png`, `{stem}_metadata.json`). A page where
    /// nothing is detected is a successful empty result, and the annotated
    /// image and metadata sidecar are still written.
    pub fn segment_image(
        &self,
        image: &RgbImage,
        stem: &str,
        output_dir: &Path,
    ) -> OcrResult<SegmentationResult> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::invalid_input("image has zero extent"));
        }

        info!(
            stem,
            width,
            height,
            intelligent = self.config.intelligent,
            document_type = ?self.config.document_type,
            "segmentation started"
        );

        let boxes = self.detect(image, width, height);
        let zones = if self.config.intelligent {
            self.classify_all(image, boxes, width, height)
        } else {
            boxes
                .into_iter()
                .enumerate()
                .map(|(index, bbox)| Zone {
                    id: index as u32 + 1,
                    bbox,
                    zone_type: ZoneType::Unknown,
                    confidence: 0.0,
                    crop_path: None,
                    content_preview: String::new(),
                })
                .collect()
        };

        let reading_order = if self.config.intelligent {
            layout_order(&zones, self.config.row_overlap_ratio)
        } else {
            raster_order(&zones)
        };

        let result = self.persist(image, zones, reading_order, stem, output_dir)?;
        info!(
            zones = result.zones.len(),
            annotated = %result.annotated_image_path.display(),
            "segmentation complete"
        );
        Ok(result)
    }

    /// Geometric detection shared by both modes.
    fn detect(&self, image: &RgbImage, width: u32, height: u32) -> Vec<BoundingBox> {
        let params = &self.config.detection;

        let mut binary = binarize(image, params.block_radius);
        close_gaps(&mut binary, params.horizontal_gap, params.vertical_gap);

        let components = component_boxes(&binary);
        debug!(components = components.len(), "component extraction");

        let candidates = filter_candidates(components, params, width, height);

        let gray = image::imageops::grayscale(image);
        let boxes: Vec<BoundingBox> = candidates
            .into_iter()
            .filter(|bbox| looks_like_text(&gray, bbox, params))
            .collect();
        debug!(zones = boxes.len(), "texture filtering");
        boxes
    }

    /// Intelligent-mode zone construction: preview, classify, merge,
    /// validate.
    fn classify_all(
        &self,
        image: &RgbImage,
        boxes: Vec<BoundingBox>,
        width: u32,
        height: u32,
    ) -> Vec<Zone> {
        let zones: Vec<Zone> = boxes
            .into_iter()
            .enumerate()
            .map(|(index, bbox)| {
                let (preview, preview_confidence) = self.preview(image, &bbox, width, height);
                let classification =
                    classify::classify_zone(&preview, preview_confidence, &bbox, width, height);
                Zone {
                    id: index as u32 + 1,
                    bbox,
                    zone_type: classification.zone_type,
                    confidence: classification.confidence,
                    crop_path: None,
                    content_preview: preview,
                }
            })
            .collect();

        let merged = merge_similar_zones(
            zones,
            self.config.merge_distance_ratio,
            self.config.max_confidence_diff,
        );
        self.validate(merged, width, height)
    }

    /// Reads a short text preview from the zone via the preview backend.
    fn preview(
        &self,
        image: &RgbImage,
        bbox: &BoundingBox,
        width: u32,
        height: u32,
    ) -> (String, f32) {
        let Some(backend) = &self.preview_backend else {
            return (String::new(), 0.0);
        };
        let expanded = bbox.expand_within(self.config.extraction_margin, width, height);
        let crop = crop_imm(image, expanded.x, expanded.y, expanded.width, expanded.height)
            .to_image();
        match backend.recognize(&crop) {
            Ok(raw) => {
                let result = LineResult::normalize(backend.key(), raw);
                let preview: String = result
                    .text()
                    .replace('\n', " ")
                    .chars()
                    .take(self.config.preview_len)
                    .collect();
                (preview, result.avg_confidence)
            }
            Err(error) => {
                warn!(%error, ?bbox, "preview recognition failed, classifying by position only");
                (String::new(), 0.0)
            }
        }
    }

    /// Drops implausible zones and renumbers the survivors.
    ///
    /// Every zone must land in the permissive validation area window; the
    /// confidence floor only applies when a preview backend contributed an
    /// OCR signal, since without one every score is positional and the
    /// floor would punish legitimately typed zones.
    fn validate(&self, mut zones: Vec<Zone>, width: u32, height: u32) -> Vec<Zone> {
        let before = zones.len();
        let page_area = (width as f64 * height as f64).max(1.0);
        zones.retain(|zone| {
            let area_ratio = (zone.bbox.area() as f64 / page_area) as f32;
            (VALIDATION_MIN_AREA_RATIO..=VALIDATION_MAX_AREA_RATIO).contains(&area_ratio)
        });
        if self.preview_backend.is_some() {
            zones.retain(|zone| zone.confidence >= self.config.min_confidence);
        }
        if zones.len() < before {
            debug!(dropped = before - zones.len(), "validation dropped zones");
        }
        for (index, zone) in zones.iter_mut().enumerate() {
            zone.id = index as u32 + 1;
        }
        zones
    }

    /// Writes crops, the annotated page and the metadata sidecar.
    ///
    /// On any write failure every artifact already written in this run is
    /// removed before the error is returned.
    fn persist(
        &self,
        image: &RgbImage,
        mut zones: Vec<Zone>,
        reading_order: Vec<u32>,
        stem: &str,
        output_dir: &Path,
    ) -> OcrResult<SegmentationResult> {
        fs::create_dir_all(output_dir)?;

        let (width, height) = image.dimensions();
        let crop_jobs: Vec<(usize, BoundingBox, PathBuf)> = zones
            .iter()
            .enumerate()
            .map(|(index, zone)| {
                let path = output_dir.join(format!(
                    "{stem}_zone_{:02}_{}.png",
                    zone.id,
                    zone.zone_type.as_str()
                ));
                let expanded =
                    zone.bbox
                        .expand_within(self.config.extraction_margin, width, height);
                (index, expanded, path)
            })
            .collect();

        let mut written: Vec<PathBuf> = Vec::new();
        let save_crop = |bbox: &BoundingBox, path: &PathBuf| -> OcrResult<()> {
            let crop = crop_imm(image, bbox.x, bbox.y, bbox.width, bbox.height).to_image();
            crop.save(path)
                .map_err(|source| OcrError::image_encode(path, source))
        };

        let crop_outcome: OcrResult<()> = if crop_jobs.len() > PARALLEL_CROP_THRESHOLD {
            crop_jobs
                .par_iter()
                .map(|(_, bbox, path)| save_crop(bbox, path))
                .collect()
        } else {
            crop_jobs
                .iter()
                .try_for_each(|(_, bbox, path)| save_crop(bbox, path))
        };
        if let Err(error) = crop_outcome {
            remove_artifacts(crop_jobs.iter().map(|(_, _, path)| path));
            return Err(error);
        }
        for (index, _, path) in &crop_jobs {
            zones[*index].crop_path = Some(path.clone());
            written.push(path.clone());
        }

        let annotated_path = output_dir.join(format!("{stem}_annotated.png"));
        let annotated =
            visualization::annotate(image, &zones, &reading_order, &self.visualization);
        if let Err(source) = annotated.save(&annotated_path) {
            let error = OcrError::image_encode(&annotated_path, source);
            remove_artifacts(written.iter());
            return Err(error);
        }
        written.push(annotated_path.clone());

        let metadata_path = output_dir.join(format!("{stem}_metadata.json"));
        let result =
            SegmentationResult::new(zones, reading_order, annotated_path, metadata_path.clone());
        let metadata = match serde_json::to_string_pretty(&result) {
            Ok(metadata) => metadata,
            Err(source) => {
                remove_artifacts(written.iter());
                return Err(OcrError::Metadata(source));
            }
        };
        if let Err(source) = fs::write(&metadata_path, metadata) {
            remove_artifacts(written.iter());
            return Err(OcrError::Io(source));
        }

        Ok(result)
    }
}

/// Best-effort removal of partial artifacts after a failed run.
fn remove_artifacts<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if path.exists() {
            if let Err(error) = fs::remove_file(path) {
                warn!(path = %path.display(), %error, "failed to remove partial artifact");
            }
        }
    }
}
