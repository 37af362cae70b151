//! Arbitration result types and backend output normalization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of one OCR backend.
///
/// The backend set is closed: engines are a fixed set of polymorphic
/// implementations rather than runtime-discovered plugins, so tie-breaking
/// and testing stay deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKey {
    Tesseract,
    EasyOcr,
    DocTr,
}

impl BackendKey {
    /// Fixed priority used for deterministic tie-breaking during
    /// selection: the earlier entry wins on equal confidence.
    pub const PRIORITY: [BackendKey; 3] =
        [BackendKey::Tesseract, BackendKey::EasyOcr, BackendKey::DocTr];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKey::Tesseract => "tesseract",
            BackendKey::EasyOcr => "easyocr",
            BackendKey::DocTr => "doctr",
        }
    }
}

impl std::fmt::Display for BackendKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One text line as reported by a backend, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    /// Recognized text.
    pub text: String,
    /// Backend-reported confidence in [0, 100], if the backend reports one.
    pub confidence: Option<f32>,
    /// Vertical anchor used to restore reading order, if the backend
    /// reports one.
    pub baseline_y: Option<f32>,
}

impl RawLine {
    /// A line with a confidence and no vertical anchor.
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
            baseline_y: None,
        }
    }

    /// Sets the vertical anchor.
    pub fn at_baseline(mut self, baseline_y: f32) -> Self {
        self.baseline_y = Some(baseline_y);
        self
    }
}

/// Unnormalized output of a single backend run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecognition {
    /// Recognized lines, in whatever order the backend produced them.
    pub lines: Vec<RawLine>,
}

impl RawRecognition {
    /// Builds a raw recognition from `(text, confidence)` pairs.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<f32>)>,
        S: Into<String>,
    {
        Self {
            lines: lines
                .into_iter()
                .map(|(text, confidence)| RawLine::new(text, confidence))
                .collect(),
        }
    }
}

/// A recognized text line with its backend-reported confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLine {
    /// Recognized text, trimmed.
    pub text: String,
    /// Backend-reported confidence in [0, 100], if reported.
    pub confidence: Option<f32>,
}

/// Normalized result of one backend on one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineResult {
    /// The backend that produced this result.
    pub backend: BackendKey,
    /// Recognized lines; insertion order is the vertical reading order on
    /// the image.
    pub lines: Vec<RecognizedLine>,
    /// Mean of the reported per-line confidences, in [0, 100]. A backend
    /// that reports no confidence at all gets 0.0, never an absent value,
    /// so comparison across backends stays total.
    pub avg_confidence: f32,
}

impl LineResult {
    /// Normalizes a backend's raw output into the common shape.
    ///
    /// Blank lines are dropped, the vertical order is restored from the
    /// baseline anchors when every surviving line carries one, and the
    /// mean confidence is computed over the lines that report one
    /// (clamped to [0, 100]).
    pub fn normalize(backend: BackendKey, raw: RawRecognition) -> Self {
        let mut raw_lines: Vec<RawLine> = raw
            .lines
            .into_iter()
            .filter(|line| !line.text.trim().is_empty())
            .collect();

        if !raw_lines.is_empty() && raw_lines.iter().all(|line| line.baseline_y.is_some()) {
            raw_lines.sort_by(|a, b| {
                a.baseline_y
                    .partial_cmp(&b.baseline_y)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let confidences: Vec<f32> = raw_lines
            .iter()
            .filter_map(|line| line.confidence)
            .map(|confidence| confidence.clamp(0.0, 100.0))
            .collect();
        let avg_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };

        let lines = raw_lines
            .into_iter()
            .map(|line| RecognizedLine {
                text: line.text.trim().to_string(),
                confidence: line.confidence.map(|c| c.clamp(0.0, 100.0)),
            })
            .collect();

        Self {
            backend,
            lines,
            avg_confidence,
        }
    }

    /// All lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Aggregate across all attempted backends, plus the selected best.
///
/// Invariant: `best_backend` is always a key of `by_backend`. A failed
/// backend is simply absent, never present with a sentinel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationResult {
    /// One entry per backend that produced a result.
    pub by_backend: BTreeMap<BackendKey, LineResult>,
    /// The key in `by_backend` with the maximum mean confidence; ties are
    /// broken by [`BackendKey::PRIORITY`].
    pub best_backend: BackendKey,
}

impl ArbitrationResult {
    /// The selected best result.
    pub fn best(&self) -> &LineResult {
        &self.by_backend[&self.best_backend]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_without_confidence_yields_zero() {
        let raw = RawRecognition::from_lines([("hello", None), ("world", None)]);
        let result = LineResult::normalize(BackendKey::Tesseract, raw);
        assert_eq!(result.avg_confidence, 0.0);
        assert_eq!(result.lines.len(), 2);
    }

    #[test]
    fn normalize_drops_blank_lines_and_averages_reported_confidences() {
        let raw = RawRecognition::from_lines([
            ("first", Some(80.0)),
            ("   ", Some(10.0)),
            ("second", Some(60.0)),
            ("third", None),
        ]);
        let result = LineResult::normalize(BackendKey::EasyOcr, raw);
        assert_eq!(result.lines.len(), 3);
        assert!((result.avg_confidence - 70.0).abs() < f32::EPSILON);
    }

    #[test]
    fn normalize_restores_vertical_order_from_baselines() {
        let raw = RawRecognition {
            lines: vec![
                RawLine::new("bottom", Some(50.0)).at_baseline(200.0),
                RawLine::new("top", Some(50.0)).at_baseline(20.0),
                RawLine::new("middle", Some(50.0)).at_baseline(100.0),
            ],
        };
        let result = LineResult::normalize(BackendKey::DocTr, raw);
        let texts: Vec<&str> = result.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["top", "middle", "bottom"]);
    }

    #[test]
    fn normalize_clamps_out_of_range_confidences() {
        let raw = RawRecognition::from_lines([("a", Some(150.0)), ("b", Some(-10.0))]);
        let result = LineResult::normalize(BackendKey::Tesseract, raw);
        assert!((result.avg_confidence - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn joined_text_preserves_line_order() {
        let raw = RawRecognition::from_lines([("one", Some(90.0)), ("two", Some(90.0))]);
        let result = LineResult::normalize(BackendKey::Tesseract, raw);
        assert_eq!(result.text(), "one\ntwo");
    }
}
