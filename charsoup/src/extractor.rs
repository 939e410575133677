//! Text -> bucket-count feature vector.
//!
//! Pipeline: truncate -> strip URLs/emails -> NFC normalize -> tokenize.
//! `extract_preprocessed*` skip the first three steps for callers that
//! already preprocessed text offline (training pipelines, batch jobs).

use crate::error::{Error, Result};
use crate::hasher::{bucket_index, hash_ngram};
use crate::preprocess::{self, Stripper};
use crate::unicode;

const SENTINEL: u32 = '_' as u32;

/// Converts text into a dense bucket-count vector over `num_buckets`
/// buckets, optionally including trigrams.
pub struct FeatureExtractor {
    num_buckets: u32,
    include_trigrams: bool,
    stripper: Stripper,
}

impl FeatureExtractor {
    /// Construct an extractor. Rejects `num_buckets == 0` as `BadArgument`.
    pub fn new(num_buckets: u32, include_trigrams: bool) -> Result<Self> {
        if num_buckets == 0 {
            return Err(Error::BadArgument("num_buckets must be positive".into()));
        }
        Ok(Self {
            num_buckets,
            include_trigrams,
            stripper: Stripper::new(),
        })
    }

    pub fn num_buckets(&self) -> u32 {
        self.num_buckets
    }

    pub fn include_trigrams(&self) -> bool {
        self.include_trigrams
    }

    /// Full pipeline: preprocess then tokenize. Allocates a fresh vector.
    pub fn extract(&self, text: &str) -> Vec<i32> {
        let mut buf = vec![0i32; self.num_buckets as usize];
        self.extract_into(text, &mut buf);
        buf
    }

    /// Full pipeline into an existing buffer, which is zeroed first.
    pub fn extract_into(&self, text: &str, buf: &mut Vec<i32>) {
        let pre = preprocess::preprocess(text, &self.stripper);
        self.extract_preprocessed_into(&pre, buf, true);
    }

    /// Tokenize already-preprocessed text. Allocates a fresh vector.
    pub fn extract_preprocessed(&self, text: &str) -> Vec<i32> {
        let mut buf = vec![0i32; self.num_buckets as usize];
        self.extract_preprocessed_into(text, &mut buf, true);
        buf
    }

    /// Tokenize already-preprocessed text into `buf`.
    ///
    /// If `clear` is true, `buf` is resized to `num_buckets` and zeroed
    /// before tokenizing (the callee never reads the prior contents). If
    /// `clear` is false, counts are accumulated onto whatever `buf` already
    /// holds (the callee reads then writes) — used to sum counts across
    /// multiple sources.
    pub fn extract_preprocessed_into(&self, text: &str, buf: &mut Vec<i32>, clear: bool) {
        if clear || buf.len() != self.num_buckets as usize {
            buf.clear();
            buf.resize(self.num_buckets as usize, 0);
        }

        let mut in_word = false;
        let mut prev: Option<u32> = None;
        let mut prev_prev: Option<u32> = None;

        for ch in text.chars() {
            let cp = ch as u32;
            if unicode::is_transparent(cp) {
                continue;
            }
            if unicode::is_letter(ch) {
                let lower = ch.to_lowercase().next().unwrap_or(ch);
                let lcp = lower as u32;
                if !in_word {
                    self.emit(&[SENTINEL, lcp], buf.as_mut_slice());
                    in_word = true;
                    prev = Some(lcp);
                    prev_prev = None;
                } else {
                    let p = prev.expect("in_word implies prev is set");
                    self.emit(&[p, lcp], buf.as_mut_slice());
                    if self.include_trigrams {
                        if let Some(pp) = prev_prev {
                            self.emit(&[pp, p, lcp], buf.as_mut_slice());
                        }
                    }
                    prev_prev = prev;
                    prev = Some(lcp);
                }
            } else {
                self.finalize_word(&mut in_word, &mut prev, &mut prev_prev, buf.as_mut_slice());
            }
        }
        self.finalize_word(&mut in_word, &mut prev, &mut prev_prev, buf.as_mut_slice());
    }

    #[inline]
    fn emit(&self, cps: &[u32], buf: &mut [i32]) {
        let bucket = bucket_index(hash_ngram(cps), self.num_buckets) as usize;
        buf[bucket] += 1;
    }

    fn finalize_word(
        &self,
        in_word: &mut bool,
        prev: &mut Option<u32>,
        prev_prev: &mut Option<u32>,
        buf: &mut [i32],
    ) {
        if *in_word {
            if let Some(p) = *prev {
                self.emit(&[p, SENTINEL], buf);
                if self.include_trigrams {
                    if let Some(pp) = *prev_prev {
                        self.emit(&[pp, p, SENTINEL], buf);
                    }
                }
            }
        }
        *in_word = false;
        *prev = None;
        *prev_prev = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(v: &[i32]) -> i64 {
        v.iter().map(|&x| x as i64).sum()
    }

    #[test]
    fn rejects_zero_buckets() {
        assert!(FeatureExtractor::new(0, false).is_err());
    }

    #[test]
    fn empty_input_is_all_zero() {
        let ex = FeatureExtractor::new(4096, false).unwrap();
        let v = ex.extract("");
        assert!(v.iter().all(|&x| x == 0));
    }

    #[test]
    fn all_entries_non_negative() {
        let ex = FeatureExtractor::new(4096, true).unwrap();
        let v = ex.extract("The quick brown fox jumps over the lazy dog.");
        assert!(v.iter().all(|&x| x >= 0));
    }

    #[test]
    fn single_word_emits_bigrams_for_each_boundary() {
        // "ab" -> (_ a) (a b) (b _): 3 bigrams.
        let ex = FeatureExtractor::new(1 << 20, false).unwrap();
        let v = ex.extract_preprocessed("ab");
        assert_eq!(sum(&v), 3);
    }

    #[test]
    fn only_transparent_codepoints_yield_zero_features() {
        let ex = FeatureExtractor::new(4096, false).unwrap();
        // Arabic harakat only, no base letters.
        let text = "\u{064E}\u{0650}\u{0651}";
        let v = ex.extract_preprocessed(text);
        assert_eq!(sum(&v), 0);
    }

    #[test]
    fn harakat_do_not_change_bigrams() {
        let ex = FeatureExtractor::new(1 << 16, false).unwrap();
        let plain = ex.extract_preprocessed("\u{0643}\u{062A}\u{0628}"); // ktb
        let with_harakat =
            ex.extract_preprocessed("\u{0643}\u{064E}\u{062A}\u{064E}\u{0628}\u{064E}");
        assert_eq!(plain, with_harakat);
    }

    #[test]
    fn tatweel_does_not_change_bigrams() {
        let ex = FeatureExtractor::new(1 << 16, false).unwrap();
        let plain = ex.extract_preprocessed("\u{0643}\u{062A}\u{0628}");
        let with_tatweel =
            ex.extract_preprocessed("\u{0643}\u{0640}\u{062A}\u{0640}\u{0628}");
        assert_eq!(plain, with_tatweel);
    }

    #[test]
    fn trigrams_require_two_prior_letters() {
        let ex = FeatureExtractor::new(1 << 20, true).unwrap();
        // "ab": only one letter precedes 'b', so no mid-word trigram, but
        // by word end prev_prev is Some('a') and prev is Some('b'), so the
        // word-final trigram (a, b, _) is emitted.
        let v = ex.extract_preprocessed("ab");
        // 3 bigrams ( _,a) (a,b) (b,_ ) plus 1 word-final trigram (a,b,_).
        assert_eq!(sum(&v), 4);

        // "abc": mid-word trigram (a,b,c) plus word-final trigram (b,c,_).
        let v2 = ex.extract_preprocessed("abc");
        // bigrams: (_,a) (a,b) (b,c) (c,_) = 4, trigrams: (a,b,c) (b,c,_) = 2
        assert_eq!(sum(&v2), 6);
    }

    #[test]
    fn extract_preprocessed_into_accumulates_when_not_cleared() {
        let ex = FeatureExtractor::new(4096, false).unwrap();
        let mut buf = vec![0i32; 4096];
        ex.extract_preprocessed_into("ab", &mut buf, false);
        let first_sum = sum(&buf);
        ex.extract_preprocessed_into("ab", &mut buf, false);
        assert_eq!(sum(&buf), first_sum * 2);
    }

    #[test]
    fn lowercasing_makes_case_insensitive() {
        let ex = FeatureExtractor::new(1 << 16, false).unwrap();
        assert_eq!(ex.extract_preprocessed("AB"), ex.extract_preprocessed("ab"));
    }
}
