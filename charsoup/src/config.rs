//! Tunable knobs for detection and arbitration, loadable from TOML.
//!
//! Mirrors the teacher's `Config::{load_toml, save_toml, from_toml_str,
//! to_toml_string}` pattern: a plain serde-derived struct with a
//! `Default` impl supplying every value named in this crate's external
//! interface, round-tripped through the `toml` crate rather than hand-
//! rolled parsing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detector buffer cap, in codepoints.
    pub max_length: usize,
    /// Size of one independently-evaluated chunk, in codepoints.
    pub chunk_size: usize,
    /// Buffer length at which `has_enough_text` becomes true.
    pub enough_text_length: usize,
    /// Per-chunk early-exit entropy threshold, in bits.
    pub entropy_threshold: f32,
    /// Entropy value at which `confidence_score` saturates to 0.
    pub max_entropy_for_confidence: f32,
    /// Minimum arbitration confidence to accept a scored candidate.
    pub min_confidence_threshold: f32,
    /// Maximum junk ratio before a candidate is discarded pre-scoring.
    pub max_junk_ratio: f32,
    /// Whether feature extraction should also emit trigrams. Must match
    /// the loaded model's declared setting.
    pub include_trigrams: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_length: 100_000,
            chunk_size: 5_000,
            enough_text_length: 10_000,
            entropy_threshold: 3.5,
            max_entropy_for_confidence: 7.0,
            min_confidence_threshold: 0.88,
            max_junk_ratio: 0.10,
            include_trigrams: false,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| crate::error::Error::BadArgument(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::error::Error::BadArgument(e.to_string()))
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = self.to_toml_string()?;
        fs::write(path, contents)?;
        Ok(())
    }
}
