//! Error types for segmentation and arbitration.
//!
//! Failures local to one backend or one zone are contained and reported as
//! partial data; failures that make the returned value meaningless (the
//! input image cannot be decoded, no backend produced text) are raised to
//! the caller as explicit errors, never masked as empty success.

use thiserror::Error;

use crate::domain::BackendKey;

/// Convenient result alias for operations in this crate.
pub type OcrResult<T> = Result<T, OcrError>;

/// Errors produced by the segmentation and arbitration pipelines.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The input image could not be decoded.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// A derived artifact (crop, annotated image) could not be encoded.
    #[error("image encode: {path}")]
    ImageEncode {
        /// Destination path of the artifact that failed to encode.
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// The geometric or classification stage failed unrecoverably.
    ///
    /// Never used for a legitimately blank page: zero detected zones is a
    /// successful outcome, not an error.
    #[error("segmentation failed: {context}")]
    Segmentation {
        /// Human-readable cause.
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// One OCR backend could not run (missing dependency, crash, timeout).
    ///
    /// Contained by the arbitrator: the backend is omitted from the
    /// aggregate and the failure only surfaces in logs, unless every
    /// backend fails.
    #[error("backend {backend} unavailable: {message}")]
    BackendFailure {
        /// The backend that failed.
        backend: BackendKey,
        /// Human-readable cause.
        message: String,
    },

    /// Every configured backend failed or timed out.
    #[error("no usable OCR result ({attempted} backend(s) attempted)")]
    NoUsableResult {
        /// Number of backends that were attempted.
        attempted: usize,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error serializing the metadata sidecar.
    #[error("metadata serialization")]
    Metadata(#[from] serde_json::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Creates a segmentation error with a human-readable cause.
    pub fn segmentation(context: impl Into<String>) -> Self {
        Self::Segmentation {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a segmentation error wrapping an underlying error.
    pub fn segmentation_with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Segmentation {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a backend failure for the given backend.
    pub fn backend_failure(backend: BackendKey, message: impl Into<String>) -> Self {
        Self::BackendFailure {
            backend,
            message: message.into(),
        }
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an image-encode error for the given destination path.
    pub fn image_encode(path: &std::path::Path, source: image::ImageError) -> Self {
        Self::ImageEncode {
            path: path.display().to_string(),
            source,
        }
    }
}
