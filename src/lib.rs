//! # Zonal OCR
//!
//! A Rust library that partitions scanned document images into semantically
//! typed zones and arbitrates between several independent OCR backends.
//!
//! The crate exposes two collaborators that are independent at the data-flow
//! level and composed by the caller:
//!
//! - **Zone segmentation**: geometric text-block detection, optional semantic
//!   classification of each zone (header, price, date, address, reference,
//!   paragraph, signature, footer) and a layout-aware reading order.
//! - **OCR arbitration**: runs every configured recognition backend against
//!   one image, normalizes each backend's output into a common shape and
//!   deterministically selects the most trustworthy result by mean
//!   confidence.
//!
//! ## Modules
//!
//! * [`core`] - Error handling and configuration records
//! * [`domain`] - Zone, segmentation-result and arbitration-result types
//! * [`processors`] - Binarization, region extraction and reading-order logic
//! * [`segmenter`] - The zone segmentation pipeline
//! * [`arbiter`] - The multi-backend OCR arbitrator
//! * [`utils`] - Image loading helpers
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zonal_ocr::prelude::*;
//!
//! # fn main() -> OcrResult<()> {
//! let config = SegmenterConfig::intelligent(DocumentType::Invoice);
//! let segmenter = ZoneSegmenter::new(config);
//! let result = segmenter.segment_file(Path::new("scan.png"), Path::new("out"))?;
//!
//! for id in &result.reading_order {
//!     let zone = result.zone(*id).expect("reading order is a permutation");
//!     println!("{}: {}", zone.zone_type, zone.content_preview);
//! }
//! # Ok(())
//! # }
//! ```

pub mod arbiter;
pub mod core;
pub mod domain;
pub mod processors;
pub mod segmenter;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    // Error handling
    pub use crate::core::{OcrError, OcrResult};

    // Configuration
    pub use crate::core::{ArbitratorConfig, DetectionParams, SegmenterConfig};

    // Domain types
    pub use crate::domain::{
        ArbitrationResult, BackendKey, DocumentType, LineResult, RawLine, RawRecognition,
        RecognizedLine, SegmentationResult, Zone, ZoneType,
    };

    // Geometry
    pub use crate::processors::BoundingBox;

    // High-level API
    pub use crate::arbiter::{OcrArbitrator, OcrBackend};
    pub use crate::segmenter::ZoneSegmenter;

    // Image utilities
    pub use crate::utils::load_image;
}
