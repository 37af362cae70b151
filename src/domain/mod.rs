//! Domain types: zones, segmentation results and arbitration results.

pub mod arbitration;
pub mod zone;

pub use arbitration::{
    ArbitrationResult, BackendKey, LineResult, RawLine, RawRecognition, RecognizedLine,
};
pub use zone::{DocumentType, SegmentationResult, Zone, ZoneType};
