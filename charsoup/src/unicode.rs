//! Minimal Unicode property lookups needed by the feature extractor.
//!
//! Nothing in the teacher's or pack's dependency set exposes the full
//! Unicode Character Database, so the handful of properties the
//! tokenizer needs are hand-tabulated here as sorted, inclusive code point
//! ranges and located with a binary search — the same shape as the
//! `classify_codepoint` lookup table used for script classification in
//! hashed language-identification feature extractors generally.
//!
//! `MN_RANGES` approximates the Unicode "Nonspacing Mark" (Mn) general
//! category: the combining-diacritical blocks for the scripts this crate's
//! confusable groups and test scenarios actually exercise (Arabic, Hebrew,
//! Devanagari, Thai, Latin) plus the generic combining-mark blocks. It is
//! not a complete Mn table for every script Unicode defines.

type Range = (u32, u32);

const MN_RANGES: &[Range] = &[
    (0x0300, 0x036F), // Combining Diacritical Marks
    (0x0483, 0x0489), // Cyrillic combining marks
    (0x0591, 0x05BD), // Hebrew points
    (0x05BF, 0x05BF),
    (0x05C1, 0x05C2),
    (0x05C4, 0x05C5),
    (0x05C7, 0x05C7),
    (0x0610, 0x061A), // Arabic marks
    (0x064B, 0x065F), // Arabic harakat
    (0x0670, 0x0670),
    (0x06D6, 0x06DC),
    (0x06DF, 0x06E4),
    (0x06E7, 0x06E8),
    (0x06EA, 0x06ED),
    (0x0711, 0x0711), // Syriac
    (0x0730, 0x074A),
    (0x07A6, 0x07B0), // Thaana
    (0x07EB, 0x07F3),
    (0x0816, 0x0819), // Samaritan
    (0x081B, 0x0823),
    (0x0825, 0x0827),
    (0x0829, 0x082D),
    (0x0900, 0x0902), // Devanagari
    (0x093A, 0x093A),
    (0x093C, 0x093C),
    (0x0941, 0x0948),
    (0x094D, 0x094D),
    (0x0951, 0x0957),
    (0x0962, 0x0963),
    (0x0E31, 0x0E31), // Thai
    (0x0E34, 0x0E3A),
    (0x0E47, 0x0E4E),
    (0x0EB1, 0x0EB1), // Lao
    (0x0EB4, 0x0EB9),
    (0x0EBB, 0x0EBC),
    (0x0EC8, 0x0ECD),
    (0x1AB0, 0x1AFF), // Combining Diacritical Marks Extended
    (0x1DC0, 0x1DFF), // Combining Diacritical Marks Supplement
    (0x20D0, 0x20F0), // Combining Diacritical Marks for Symbols
    (0xFE20, 0xFE2F), // Combining Half Marks
];

fn in_ranges(cp: u32, ranges: &[Range]) -> bool {
    ranges
        .binary_search_by(|&(lo, hi)| {
            if cp < lo {
                std::cmp::Ordering::Greater
            } else if cp > hi {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

/// `U+0640` Arabic Tatweel.
pub const TATWEEL: u32 = 0x0640;
/// `U+200C` Zero Width Non-Joiner.
pub const ZWNJ: u32 = 0x200C;
/// `U+200D` Zero Width Joiner.
pub const ZWJ: u32 = 0x200D;

/// True if `cp` should be skipped entirely by the tokenizer: a nonspacing
/// mark, Tatweel, ZWNJ, or ZWJ. ASCII (`cp < 0x0300`) is fast-pathed to
/// `false` since none of these code points are ASCII.
#[inline]
pub fn is_transparent(cp: u32) -> bool {
    if cp < 0x0300 {
        return false;
    }
    cp == TATWEEL || cp == ZWNJ || cp == ZWJ || in_ranges(cp, MN_RANGES)
}

/// True if `c` is a letter for tokenization purposes. Delegates to
/// `char::is_alphabetic`, which implements the Unicode "Alphabetic"
/// property and is available without pulling in a UCD crate.
#[inline]
pub fn is_letter(c: char) -> bool {
    c.is_alphabetic()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_never_transparent() {
        for cp in 0u32..0x0300 {
            assert!(!is_transparent(cp), "cp {cp:#x} flagged transparent");
        }
    }

    #[test]
    fn arabic_harakat_are_transparent() {
        // FATHA
        assert!(is_transparent(0x064E));
        // KASRA
        assert!(is_transparent(0x0650));
    }

    #[test]
    fn tatweel_and_joiners_are_transparent() {
        assert!(is_transparent(TATWEEL));
        assert!(is_transparent(ZWNJ));
        assert!(is_transparent(ZWJ));
    }

    #[test]
    fn arabic_letters_are_not_transparent() {
        // ALEF
        assert!(!is_transparent(0x0627));
    }

    #[test]
    fn hebrew_points_are_transparent() {
        assert!(is_transparent(0x05B4));
    }
}
