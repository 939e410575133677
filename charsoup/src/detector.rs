//! Buffering, chunked evaluation, entropy-driven early exit, and confidence
//! banding over a loaded [`Model`].

use crate::confusables::GroupTable;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractor::FeatureExtractor;
use crate::kernel;
use crate::model::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    None,
    Low,
    Medium,
    High,
}

/// One ranked entry from [`Detector::detect_all`]. `label` is `None` only
/// for the empty-buffer null result and the NONE-band fallback result.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub label: Option<String>,
    pub band: ConfidenceBand,
    pub raw_prob: f32,
    pub confidence_score: f32,
}

impl DetectionResult {
    fn null() -> Self {
        DetectionResult {
            label: None,
            band: ConfidenceBand::None,
            raw_prob: 0.0,
            confidence_score: f32::NAN,
        }
    }
}

fn confidence_band(raw_prob: f32, entropy: f32) -> ConfidenceBand {
    if entropy > 4.0 {
        return ConfidenceBand::None;
    }
    if raw_prob > 0.9 {
        return ConfidenceBand::High;
    }
    if raw_prob > 0.7 {
        return if entropy < 2.0 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        };
    }
    if raw_prob > 0.2 {
        return ConfidenceBand::Low;
    }
    ConfidenceBand::None
}

/// A detector instance: a growable codepoint buffer plus the model and
/// extractor it scores against. Not required to be `Sync` — each instance
/// owns a private buffer.
pub struct Detector<'m> {
    model: &'m Model,
    extractor: FeatureExtractor,
    group_table: GroupTable,
    config: Config,
    buffer: Vec<char>,
    last_entropy: f32,
}

impl<'m> Detector<'m> {
    pub fn new(model: &'m Model) -> Result<Self> {
        Self::with_config(model, Config::default())
    }

    pub fn with_config(model: &'m Model, config: Config) -> Result<Self> {
        let extractor = model.create_extractor()?;
        let group_table = GroupTable::compile(model.labels());
        Ok(Detector {
            model,
            extractor,
            group_table,
            config,
            buffer: Vec::new(),
            last_entropy: f32::NAN,
        })
    }

    /// Append `text`'s codepoints, dropping anything past `max_length -
    /// buffer.len()` silently. Maps the source's `add_text(cs, off, len)`
    /// signature onto a `&str` parameter, which is the idiomatic carrier
    /// for "some codepoints" in Rust.
    pub fn add_text(&mut self, text: &str) {
        let remaining = self.config.max_length.saturating_sub(self.buffer.len());
        if remaining == 0 {
            return;
        }
        self.buffer.extend(text.chars().take(remaining));
    }

    pub fn has_enough_text(&self) -> bool {
        self.buffer.len() >= self.config.enough_text_length
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_entropy = f32::NAN;
    }

    pub fn distribution_entropy(&self) -> f32 {
        self.last_entropy
    }

    pub fn set_max_length(&mut self, max_length: usize) {
        self.config.max_length = max_length;
        self.buffer.truncate(max_length);
    }

    /// Unsupported: CharSoup has no priors mechanism. Always fails.
    pub fn set_priors(&mut self) -> Result<()> {
        Err(Error::Unsupported("set_priors is not supported"))
    }

    /// Unsupported: models are loaded whole, never as a label subset.
    pub fn load_models(&mut self, _subset: &[&str]) -> Result<()> {
        Err(Error::Unsupported("load_models(subset) is not supported"))
    }

    /// Run the chunked detection algorithm described in spec.md §4.6.
    pub fn detect_all(&mut self) -> Vec<DetectionResult> {
        if self.buffer.is_empty() {
            self.last_entropy = f32::NAN;
            return vec![DetectionResult::null()];
        }

        let chunk_size = self.config.chunk_size.max(1);
        let num_classes = self.model.num_classes() as usize;

        let mut best_raw = Vec::new();
        let mut best_entropy = f32::INFINITY;

        let mut start = 0usize;
        while start < self.buffer.len() {
            let end = (start + chunk_size).min(self.buffer.len());
            let chunk: String = self.buffer[start..end].iter().collect();

            let features = self.extractor.extract(&chunk);
            let raw = kernel::predict(
                &features,
                self.model.weights(),
                self.model.scales(),
                self.model.biases(),
                num_classes,
            );
            let collapsed = self.group_table.collapse(&raw);
            let chunk_entropy = kernel::entropy(&collapsed);

            if chunk_entropy < best_entropy {
                best_raw = raw;
                best_entropy = chunk_entropy;
            }

            tracing::debug!(chunk_start = start, entropy = chunk_entropy, "scored chunk");

            if best_entropy < self.config.entropy_threshold {
                break;
            }
            start = end;
        }

        let collapsed = self.group_table.collapse(&best_raw);
        let chunk_entropy = kernel::entropy(&collapsed);
        self.last_entropy = chunk_entropy;

        let confidence_score =
            1.0 / (1.0 + chunk_entropy.min(self.config.max_entropy_for_confidence));

        let mut results: Vec<DetectionResult> = self
            .model
            .labels()
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let raw_prob = best_raw[i];
                DetectionResult {
                    label: Some(label.clone()),
                    band: confidence_band(raw_prob, chunk_entropy),
                    raw_prob,
                    confidence_score,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.raw_prob
                .partial_cmp(&a.raw_prob)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if let Some(top) = results.first() {
            if top.band == ConfidenceBand::None {
                return vec![DetectionResult {
                    label: None,
                    band: ConfidenceBand::None,
                    raw_prob: top.raw_prob,
                    confidence_score,
                }];
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> Model {
        // 2 classes, heavily separated weights so "aaaa..." scores class 0
        // strongly and class 1 near zero.
        Model::from_parts(
            64,
            vec!["eng".to_string(), "deu".to_string()],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
            (0..64 * 2)
                .map(|i| if i % 2 == 0 { 5i8 } else { -5i8 })
                .collect(),
            false,
        )
        .unwrap()
    }

    #[test]
    fn empty_buffer_yields_null_result_with_nan_entropy() {
        let model = tiny_model();
        let mut detector = Detector::new(&model).unwrap();
        let results = detector.detect_all();
        assert_eq!(results.len(), 1);
        assert!(results[0].label.is_none());
        assert!(detector.distribution_entropy().is_nan());
    }

    #[test]
    fn add_text_respects_max_length_cap() {
        let model = tiny_model();
        let mut detector = Detector::new(&model).unwrap();
        detector.set_max_length(5);
        detector.add_text("hello world");
        assert_eq!(detector.distribution_entropy().is_nan(), true);
        // internal buffer should be capped; verified indirectly via reset/enough-text
        detector.reset();
        assert!(!detector.has_enough_text());
    }

    #[test]
    fn has_enough_text_reaches_threshold_at_default() {
        let model = tiny_model();
        let mut detector = Detector::new(&model).unwrap();
        let text: String = std::iter::repeat('a').take(10_000).collect();
        detector.add_text(&text);
        assert!(detector.has_enough_text());
    }

    #[test]
    fn reset_clears_buffer_and_entropy() {
        let model = tiny_model();
        let mut detector = Detector::new(&model).unwrap();
        detector.add_text("some text here");
        detector.detect_all();
        detector.reset();
        assert!(detector.distribution_entropy().is_nan());
        assert!(!detector.has_enough_text());
    }

    #[test]
    fn set_priors_and_load_models_are_unsupported() {
        let model = tiny_model();
        let mut detector = Detector::new(&model).unwrap();
        assert!(detector.set_priors().is_err());
        assert!(detector.load_models(&["eng"]).is_err());
    }

    #[test]
    fn detect_all_returns_ranked_results_for_nonempty_buffer() {
        let model = tiny_model();
        let mut detector = Detector::new(&model).unwrap();
        detector.add_text("the quick brown fox jumps over the lazy dog");
        let results = detector.detect_all();
        assert!(!results.is_empty());
    }
}
