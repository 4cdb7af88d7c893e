//! The 64-bit, 3-projection Bloom filter over object digests (spec §3, §4.2).
//!
//! Grounded on the teacher's `RecordStore` (`ochra-dht::bep44`): a small,
//! purpose-built in-memory structure with OR-only mutation and an explicit
//! reset, rather than a pulled-in generic Bloom-filter crate — the filter
//! here is exactly 64 bits with exactly 3 fixed projections, which a
//! generic implementation would only complicate.

use crate::id::Digest;

/// A 64-bit Bloom filter, bits OR-set on insert, cleared only by [`Bloom::clear`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Bloom(u64);

impl Bloom {
    /// An empty filter.
    pub fn new() -> Self {
        Self(0)
    }

    /// OR in the three projections of `digest`.
    pub fn insert(&mut self, digest: &Digest) {
        for bit in digest.bloom_projections() {
            self.0 |= 1u64 << bit;
        }
    }

    /// True if every one of `digest`'s three projected bits is set.
    ///
    /// A `true` result may be a false positive; a `false` result is a
    /// certain miss (spec §4.2 `lookup`).
    pub fn probe(&self, digest: &Digest) -> bool {
        digest
            .bloom_projections()
            .iter()
            .all(|&bit| self.0 & (1u64 << bit) != 0)
    }

    /// Reset to empty (whole-arc reload, spec §3).
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// The raw 64-bit word, for tests and diagnostics.
    pub fn bits(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_probe_never_misses() {
        let mut b = Bloom::new();
        let d = Digest::of(b"ShipatSea.tga");
        b.insert(&d);
        assert!(b.probe(&d));
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut b = Bloom::new();
        b.insert(&Digest::of(b"a"));
        b.clear();
        assert_eq!(b.bits(), 0);
    }

    #[test]
    fn unrelated_digest_usually_misses() {
        let mut b = Bloom::new();
        b.insert(&Digest::of(b"a-real-name.tga"));
        // Not a guarantee for arbitrary inputs, but this pair does not collide.
        assert!(!b.probe(&Digest::of(b"a-completely-different-name.tga")));
    }
}
