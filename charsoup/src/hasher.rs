//! FNV-1a hashing of codepoint n-grams.
//!
//! This exact byte sequence is load-bearing: bigrams and trigrams must hash
//! compatibly with model artifacts produced by any other implementation of
//! this format, so the algorithm below must never change.

const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Hash a sequence of 2 or 3 codepoints (a bigram or trigram) with FNV-1a,
/// feeding each codepoint as four little-endian bytes.
#[inline]
pub fn hash_ngram(codepoints: &[u32]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &cp in codepoints {
        for byte in cp.to_le_bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Map a hash to a bucket index in `[0, num_buckets)`.
#[inline]
pub fn bucket_index(hash: u32, num_buckets: u32) -> u32 {
    (hash & 0x7FFF_FFFF) % num_buckets
}
