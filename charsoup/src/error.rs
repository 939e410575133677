//! Error taxonomy for charsoup.
//!
//! Loaders are all-or-nothing: a `Model` is either fully valid or the call
//! returns one of these variants with no partially constructed state left
//! behind. The inference hot path (`kernel::predict`) does not participate
//! in this taxonomy at all — callers are contractually required to pass a
//! features slice of the right length, and a debug-only assertion catches
//! violations in development builds.

use std::fmt;

/// Why a format violation was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatReason {
    BadMagic { found: u32 },
    UnsupportedVersion { found: u32 },
    Truncated,
    LabelTooLong { index: usize, len: usize },
    NonUtf8Label { index: usize },
    DuplicateLabel { label: String },
    WeightSizeMismatch { expected: u64, found: u64 },
}

impl fmt::Display for FormatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatReason::BadMagic { found } => {
                write!(f, "bad magic: 0x{found:08X}")
            }
            FormatReason::UnsupportedVersion { found } => {
                write!(f, "unsupported version: {found}")
            }
            FormatReason::Truncated => write!(f, "truncated input"),
            FormatReason::LabelTooLong { index, len } => {
                write!(f, "label {index} length {len} exceeds u16 range")
            }
            FormatReason::NonUtf8Label { index } => {
                write!(f, "label {index} is not valid UTF-8")
            }
            FormatReason::DuplicateLabel { label } => {
                write!(f, "duplicate label: {label}")
            }
            FormatReason::WeightSizeMismatch { expected, found } => {
                write!(f, "weight blob size mismatch: expected {expected}, found {found}")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("format error: {0}")]
    Format(#[from] FormatReasonError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Newtype so `FormatReason` can participate in `#[from]` without requiring
/// `std::error::Error` on a bare enum of reasons.
#[derive(Debug)]
pub struct FormatReasonError(pub FormatReason);

impl fmt::Display for FormatReasonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for FormatReasonError {}

impl Error {
    pub fn format(reason: FormatReason) -> Self {
        Error::Format(FormatReasonError(reason))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
