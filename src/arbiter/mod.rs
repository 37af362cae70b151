//! Multi-backend OCR arbitration.
//!
//! The arbitrator runs every registered backend on the same image, one
//! thread per backend, normalizes whatever comes back, and deterministically
//! selects the best result by mean confidence with a fixed priority order
//! breaking ties. Backend failures and deadline overruns degrade the result
//! instead of failing the call; only zero usable results is an error.

pub mod backend;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::core::{ArbitratorConfig, OcrError, OcrResult};
use crate::domain::{ArbitrationResult, BackendKey, LineResult, RawRecognition};

pub use backend::OcrBackend;

/// Runs a set of OCR backends against one image and picks a winner.
pub struct OcrArbitrator {
    backends: Vec<Arc<dyn OcrBackend>>,
    config: ArbitratorConfig,
}

impl OcrArbitrator {
    /// Creates an arbitrator over the given backends.
    pub fn new(backends: Vec<Arc<dyn OcrBackend>>, config: ArbitratorConfig) -> Self {
        Self { backends, config }
    }

    /// The keys of the registered backends.
    pub fn backend_keys(&self) -> Vec<BackendKey> {
        self.backends.iter().map(|backend| backend.key()).collect()
    }

    /// Runs every backend on the image and selects the best result.
    ///
    /// Each backend runs on its own thread against a shared copy of the
    /// image. A backend that errors is logged and omitted from the result;
    /// when a timeout is configured, backends still running at the deadline
    /// are abandoned and treated the same way. The selection depends only
    /// on the collected results, never on arrival order.
    ///
    /// Registering the same [`BackendKey`] twice is rejected as invalid
    /// input; duplicate keys would silently shadow each other in
    /// `by_backend`.
    pub fn arbitrate(&self, image: &RgbImage) -> OcrResult<ArbitrationResult> {
        if self.backends.is_empty() {
            return Err(OcrError::NoUsableResult { attempted: 0 });
        }
        let keys = self.backend_keys();
        for (index, key) in keys.iter().enumerate() {
            if keys[..index].contains(key) {
                return Err(OcrError::invalid_input(format!(
                    "backend key {key} registered more than once"
                )));
            }
        }

        let attempted = self.backends.len();
        let shared = Arc::new(image.clone());
        let (tx, rx) = mpsc::channel::<(BackendKey, OcrResult<RawRecognition>)>();

        for backend in &self.backends {
            let backend = Arc::clone(backend);
            let image = Arc::clone(&shared);
            let tx = tx.clone();
            thread::spawn(move || {
                let outcome = backend.recognize(&image);
                // The receiver may already have given up on the deadline.
                let _ = tx.send((backend.key(), outcome));
            });
        }
        drop(tx);

        let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);
        let mut by_backend: BTreeMap<BackendKey, LineResult> = BTreeMap::new();
        let mut received = 0;

        while received < attempted {
            let message = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(remaining) {
                        Ok(message) => message,
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            warn!(
                                outstanding = attempted - received,
                                "arbitration deadline expired, abandoning outstanding backends"
                            );
                            break;
                        }
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };
            received += 1;

            let (key, outcome) = message;
            match outcome {
                Ok(raw) => {
                    let result = LineResult::normalize(key, raw);
                    debug!(
                        backend = %key,
                        lines = result.lines.len(),
                        avg_confidence = result.avg_confidence,
                        "backend completed"
                    );
                    by_backend.insert(key, result);
                }
                Err(error) => {
                    warn!(backend = %key, %error, "backend failed");
                }
            }
        }

        let best_backend =
            select_best(&by_backend).ok_or(OcrError::NoUsableResult { attempted })?;
        info!(
            best = %best_backend,
            collected = by_backend.len(),
            attempted,
            "arbitration complete"
        );
        Ok(ArbitrationResult {
            by_backend,
            best_backend,
        })
    }
}

/// The key with the maximum mean confidence.
///
/// Iterating the fixed priority order and requiring a strictly greater
/// confidence to displace the current best makes ties resolve to the
/// earlier priority entry, independent of map or arrival order.
fn select_best(by_backend: &BTreeMap<BackendKey, LineResult>) -> Option<BackendKey> {
    let mut best: Option<(BackendKey, f32)> = None;
    for key in BackendKey::PRIORITY {
        let Some(result) = by_backend.get(&key) else {
            continue;
        };
        match best {
            Some((_, best_confidence)) if result.avg_confidence <= best_confidence => {}
            _ => best = Some((key, result.avg_confidence)),
        }
    }
    best.map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawLine;
    use std::time::Duration;

    struct StubBackend {
        key: BackendKey,
        lines: Vec<(String, Option<f32>)>,
        delay: Option<Duration>,
        fail: bool,
    }

    impl StubBackend {
        fn ok(key: BackendKey, lines: &[(&str, f32)]) -> Arc<dyn OcrBackend> {
            Arc::new(Self {
                key,
                lines: lines
                    .iter()
                    .map(|(text, confidence)| (text.to_string(), Some(*confidence)))
                    .collect(),
                delay: None,
                fail: false,
            })
        }

        fn failing(key: BackendKey) -> Arc<dyn OcrBackend> {
            Arc::new(Self {
                key,
                lines: Vec::new(),
                delay: None,
                fail: true,
            })
        }

        fn slow(key: BackendKey, delay: Duration) -> Arc<dyn OcrBackend> {
            Arc::new(Self {
                key,
                lines: vec![("late".to_string(), Some(99.0))],
                delay: Some(delay),
                fail: false,
            })
        }
    }

    impl OcrBackend for StubBackend {
        fn key(&self) -> BackendKey {
            self.key
        }

        fn recognize(&self, _image: &RgbImage) -> OcrResult<RawRecognition> {
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            if self.fail {
                return Err(OcrError::backend_failure(self.key, "engine unavailable"));
            }
            Ok(RawRecognition {
                lines: self
                    .lines
                    .iter()
                    .map(|(text, confidence)| RawLine::new(text.clone(), *confidence))
                    .collect(),
            })
        }
    }

    fn blank_image() -> RgbImage {
        RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]))
    }

    #[test]
    fn highest_confidence_wins_regardless_of_registration_order() {
        let arbitrator = OcrArbitrator::new(
            vec![
                StubBackend::ok(BackendKey::DocTr, &[("hello", 78.5)]),
                StubBackend::ok(BackendKey::Tesseract, &[("hello", 62.0)]),
            ],
            ArbitratorConfig::default(),
        );
        let result = arbitrator.arbitrate(&blank_image()).unwrap();
        assert_eq!(result.best_backend, BackendKey::DocTr);
        assert_eq!(result.by_backend.len(), 2);
        assert!((result.best().avg_confidence - 78.5).abs() < f32::EPSILON);
    }

    #[test]
    fn failed_backend_is_absent_and_never_selected() {
        let arbitrator = OcrArbitrator::new(
            vec![
                StubBackend::failing(BackendKey::Tesseract),
                StubBackend::ok(BackendKey::EasyOcr, &[("text", 40.0)]),
            ],
            ArbitratorConfig::default(),
        );
        let result = arbitrator.arbitrate(&blank_image()).unwrap();
        assert_eq!(result.best_backend, BackendKey::EasyOcr);
        assert!(!result.by_backend.contains_key(&BackendKey::Tesseract));
    }

    #[test]
    fn all_backends_failing_is_an_error() {
        let arbitrator = OcrArbitrator::new(
            vec![
                StubBackend::failing(BackendKey::Tesseract),
                StubBackend::failing(BackendKey::DocTr),
            ],
            ArbitratorConfig::default(),
        );
        match arbitrator.arbitrate(&blank_image()) {
            Err(OcrError::NoUsableResult { attempted }) => assert_eq!(attempted, 2),
            other => panic!("expected NoUsableResult, got {other:?}"),
        }
    }

    #[test]
    fn no_backends_is_an_error() {
        let arbitrator = OcrArbitrator::new(Vec::new(), ArbitratorConfig::default());
        assert!(matches!(
            arbitrator.arbitrate(&blank_image()),
            Err(OcrError::NoUsableResult { attempted: 0 })
        ));
    }

    #[test]
    fn empty_success_still_beats_nothing() {
        // A backend that legitimately reads nothing off a blank image is a
        // usable result with confidence 0.0.
        let arbitrator = OcrArbitrator::new(
            vec![
                StubBackend::failing(BackendKey::Tesseract),
                StubBackend::ok(BackendKey::DocTr, &[]),
            ],
            ArbitratorConfig::default(),
        );
        let result = arbitrator.arbitrate(&blank_image()).unwrap();
        assert_eq!(result.best_backend, BackendKey::DocTr);
        assert_eq!(result.best().avg_confidence, 0.0);
        assert!(result.best().lines.is_empty());
    }

    #[test]
    fn duplicate_backend_keys_are_rejected() {
        let arbitrator = OcrArbitrator::new(
            vec![
                StubBackend::ok(BackendKey::Tesseract, &[("first", 80.0)]),
                StubBackend::ok(BackendKey::Tesseract, &[("second", 90.0)]),
            ],
            ArbitratorConfig::default(),
        );
        assert!(matches!(
            arbitrator.arbitrate(&blank_image()),
            Err(OcrError::InvalidInput { .. })
        ));
    }

    #[test]
    fn ties_resolve_by_priority_order() {
        let arbitrator = OcrArbitrator::new(
            vec![
                StubBackend::ok(BackendKey::DocTr, &[("same", 75.0)]),
                StubBackend::ok(BackendKey::EasyOcr, &[("same", 75.0)]),
                StubBackend::ok(BackendKey::Tesseract, &[("same", 75.0)]),
            ],
            ArbitratorConfig::default(),
        );
        let result = arbitrator.arbitrate(&blank_image()).unwrap();
        assert_eq!(result.best_backend, BackendKey::Tesseract);
    }

    #[test]
    fn deadline_abandons_slow_backend() {
        let arbitrator = OcrArbitrator::new(
            vec![
                StubBackend::ok(BackendKey::Tesseract, &[("fast", 55.0)]),
                StubBackend::slow(BackendKey::DocTr, Duration::from_secs(5)),
            ],
            ArbitratorConfig {
                timeout: Some(Duration::from_millis(250)),
            },
        );
        let start = Instant::now();
        let result = arbitrator.arbitrate(&blank_image()).unwrap();
        assert!(start.elapsed() < Duration::from_secs(4));
        assert_eq!(result.best_backend, BackendKey::Tesseract);
        assert!(!result.by_backend.contains_key(&BackendKey::DocTr));
    }
}
