//! Deterministic text preprocessing shared by training and inference.
//!
//! `preprocess` must be byte-identical between whatever produced a model's
//! training corpus and this crate's inference path, and it must be
//! idempotent on already-preprocessed text (`preprocess(preprocess(t)) ==
//! preprocess(t)`) — both properties are exercised in the test suite.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Maximum number of codepoints retained by [`truncate`].
pub const MAX_CODEPOINTS: usize = 100_000;

/// Truncate `text` to at most `MAX_CODEPOINTS` codepoints.
///
/// Measured in codepoints (not UTF-16 code units) so the cap is
/// locale-independent; see the Open Questions log in DESIGN.md.
pub fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CODEPOINTS {
        return text.to_string();
    }
    text.chars().take(MAX_CODEPOINTS).collect()
}

/// Compiled, length-bounded URL and email patterns owned by the caller.
///
/// Two standalone compiled patterns (not a global/lazy cache) per the
/// "replace a global regex cache with extractor-owned compiled patterns"
/// redesign note.
pub struct Stripper {
    url: Regex,
    email: Regex,
}

impl Stripper {
    pub fn new() -> Self {
        Self {
            url: Regex::new(r"https?://[-_.?&~;+=/#0-9A-Za-z]{10,10000}")
                .expect("static URL pattern is valid"),
            email: Regex::new(r"[-_.0-9A-Za-z]{1,100}@[-_0-9A-Za-z]{1,100}[-_.0-9A-Za-z]{1,100}")
                .expect("static email pattern is valid"),
        }
    }

    /// Replace every URL/email match with a single space.
    pub fn strip(&self, text: &str) -> String {
        let stripped = self.url.replace_all(text, " ");
        self.email.replace_all(&stripped, " ").into_owned()
    }
}

impl Default for Stripper {
    fn default() -> Self {
        Self::new()
    }
}

/// NFC-normalize `text`, skipping the pass if it's already in NFC.
pub fn nfc_normalize(text: &str) -> String {
    if unicode_normalization::is_nfc(text) {
        text.to_string()
    } else {
        text.nfc().collect()
    }
}

/// Full preprocessing pipeline: truncate, strip URLs/emails, NFC normalize.
pub fn preprocess(text: &str, stripper: &Stripper) -> String {
    let truncated = truncate(text);
    let stripped = stripper.strip(&truncated);
    nfc_normalize(&stripped)
}
