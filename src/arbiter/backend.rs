//! The backend abstraction the arbitrator fans out over.

use image::RgbImage;

use crate::core::OcrResult;
use crate::domain::{BackendKey, RawRecognition};

/// One OCR engine.
///
/// Implementations wrap an external engine (a subprocess, an FFI binding, a
/// remote service) behind a synchronous call. The arbitrator runs each
/// backend on its own thread, so implementations must be `Send + Sync` but
/// are free to block.
///
/// A failing backend returns an error; it must not fabricate an empty
/// success, since an empty result is a legitimate reading of a blank image.
pub trait OcrBackend: Send + Sync {
    /// Which engine this is. Each backend in one arbitrator must report a
    /// distinct key.
    fn key(&self) -> BackendKey;

    /// Runs the engine on the full image.
    fn recognize(&self, image: &RgbImage) -> OcrResult<RawRecognition>;
}
