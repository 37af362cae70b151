//! Core error handling and configuration types.

pub mod config;
pub mod errors;

pub use config::{ArbitratorConfig, DetectionParams, SegmenterConfig};
pub use errors::{OcrError, OcrResult};
