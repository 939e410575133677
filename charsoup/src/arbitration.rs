//! Encoding arbitration: pick the candidate decoding whose text produces
//! the strongest language signal.
//!
//! Candidate strings are assumed already decoded upstream (malformed bytes
//! replaced with `U+FFFD`, `<...>` tag sequences stripped) — this module
//! only scores and filters what it's handed.

use std::collections::HashMap;
use std::hash::Hash;

use crate::config::Config;
use crate::kernel;
use crate::model::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationOutcome {
    /// All candidates decoded to the same text; no disagreement to arbitrate.
    Unanimous,
    /// The candidate map was empty.
    NoStream,
    /// Every candidate decoded to an empty string.
    EmptyStream,
    /// A candidate's confidence cleared the threshold; it won on signal strength.
    Scored,
    /// No candidate cleared the confidence threshold; the lowest-junk
    /// candidate was strictly cleaner than the default and was chosen instead.
    JunkFallback,
    /// No candidate qualified by either path; the default candidate is returned.
    Inconclusive,
}

/// Fraction of `text`'s codepoints that are `U+FFFD`, an ISO control
/// character (`U+0000..=U+001F`, `U+007F`), or a C1 control character
/// (`U+0080..=U+009F`). Empty text has junk ratio `0.0`.
pub fn junk_ratio(text: &str) -> f32 {
    let mut total = 0usize;
    let mut junk = 0usize;
    for ch in text.chars() {
        total += 1;
        let cp = ch as u32;
        if ch == '\u{FFFD}' || cp <= 0x1F || cp == 0x7F || (0x80..=0x9F).contains(&cp) {
            junk += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        junk as f32 / total as f32
    }
}

/// Logistic sigmoid.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Compare candidate decodings and pick the one with the strongest language
/// signal. `default_key` names the candidate to fall back to / compare
/// junk ratios against when the source's "first candidate" has no defined
/// order in a hash map.
pub fn compare_language_signal<K: Eq + Hash + Clone>(
    model: &Model,
    candidates: &HashMap<K, String>,
    default_key: &K,
    config: &Config,
) -> (Option<K>, ArbitrationOutcome) {
    if candidates.is_empty() {
        return (None, ArbitrationOutcome::NoStream);
    }

    if candidates.values().all(|text| text.is_empty()) {
        return (None, ArbitrationOutcome::EmptyStream);
    }

    let mut texts = candidates.values();
    let first_text = texts.next().expect("non-empty map");
    if texts.all(|t| t == first_text) {
        let key = candidates
            .get_key_value(default_key)
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| candidates.keys().next().expect("non-empty map").clone());
        return (Some(key), ArbitrationOutcome::Unanimous);
    }

    let extractor = match model.create_extractor() {
        Ok(e) => e,
        Err(_) => return (Some(default_key.clone()), ArbitrationOutcome::Inconclusive),
    };
    let num_classes = model.num_classes() as usize;

    let junk_ratios: HashMap<&K, f32> = candidates
        .iter()
        .map(|(k, text)| (k, junk_ratio(text)))
        .collect();

    let mut best: Option<(K, f32)> = None;
    for (key, text) in candidates {
        if junk_ratios[key] > config.max_junk_ratio {
            continue;
        }
        let features = extractor.extract(text);
        let logits = kernel::predict_logits(
            &features,
            model.weights(),
            model.scales(),
            model.biases(),
            num_classes,
        );
        let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let confidence = sigmoid(max_logit);

        tracing::info!(confidence, "scored arbitration candidate");

        if confidence >= config.min_confidence_threshold {
            let better = match &best {
                None => true,
                Some((_, best_conf)) => confidence > *best_conf,
            };
            if better {
                best = Some((key.clone(), confidence));
            }
        }
    }

    if let Some((key, _)) = best {
        return (Some(key), ArbitrationOutcome::Scored);
    }

    let default_junk = junk_ratios
        .get(default_key)
        .copied()
        .unwrap_or(f32::INFINITY);
    let lowest = junk_ratios
        .iter()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));

    if let Some((&key, &ratio)) = lowest {
        if ratio < default_junk {
            return (Some(key.clone()), ArbitrationOutcome::JunkFallback);
        }
    }

    (Some(default_key.clone()), ArbitrationOutcome::Inconclusive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    fn model() -> Model {
        Model::from_parts(
            64,
            vec!["eng".to_string(), "ara".to_string()],
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
    fn empty_candidate_map_is_no_stream() {
        let model = model();
        let config = Config::default();
        let candidates: HashMap<&str, String> = HashMap::new();
        let (winner, outcome) = compare_language_signal(&model, &candidates, &"utf8", &config);
        assert!(winner.is_none());
        assert_eq!(outcome, ArbitrationOutcome::NoStream);
    }

    #[test]
    fn all_empty_strings_is_empty_stream() {
        let model = model();
        let config = Config::default();
        let mut candidates = HashMap::new();
        candidates.insert("utf8", String::new());
        candidates.insert("latin1", String::new());
        let (winner, outcome) = compare_language_signal(&model, &candidates, &"utf8", &config);
        assert!(winner.is_none());
        assert_eq!(outcome, ArbitrationOutcome::EmptyStream);
    }

    #[test]
    fn identical_decodings_are_unanimous() {
        let model = model();
        let config = Config::default();
        let mut candidates = HashMap::new();
        candidates.insert("utf8", "same text".to_string());
        candidates.insert("ascii", "same text".to_string());
        let (winner, outcome) = compare_language_signal(&model, &candidates, &"utf8", &config);
        assert!(winner.is_some());
        assert_eq!(outcome, ArbitrationOutcome::Unanimous);
    }

    #[test]
    fn junk_ratio_counts_replacement_and_control_chars() {
        let clean = "hello world";
        assert_eq!(junk_ratio(clean), 0.0);

        let junky = "\u{FFFD}\u{FFFD}ab";
        assert!((junk_ratio(junky) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sigmoid_is_bounded_between_zero_and_one() {
        assert!(sigmoid(-100.0) > 0.0 && sigmoid(-100.0) < 0.01);
        assert!(sigmoid(100.0) < 1.0 && sigmoid(100.0) > 0.99);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn disagreeing_candidates_produce_scored_or_inconclusive() {
        let model = model();
        let config = Config::default();
        let mut candidates = HashMap::new();
        candidates.insert("a", "aaaaaaaaaaaaaaaaaaaaaaaa".to_string());
        candidates.insert("b", "bbbbbbbbbbbbbbbbbbbbbbbb".to_string());
        let (winner, outcome) = compare_language_signal(&model, &candidates, &"a", &config);
        assert!(matches!(
            outcome,
            ArbitrationOutcome::Scored | ArbitrationOutcome::Inconclusive | ArbitrationOutcome::JunkFallback
        ));
        assert!(winner.is_some());
    }
}
