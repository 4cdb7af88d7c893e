//! The 8-bit ring: `Id`, the half-open `in_range` predicate, and the shared
//! SHA-1 digest/ID reduction (spec §4.1).
//!
//! Node IDs and object IDs are both derived from the *same* reduction over a
//! 20-byte SHA-1 digest, so both go through [`Digest`] rather than two
//! independent hash-to-byte functions. That is the one invariant spec §4.1
//! actually requires of implementers.

use sha1::{Digest as _, Sha1};
use std::fmt;

/// A node or object identifier on the 8-bit ring `[0, 255]`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id(pub u8);

impl Id {
    /// Wrapping successor: `self + 2^i mod 256`, used to compute `fID[i]`.
    pub fn offset_pow2(self, i: u32) -> Id {
        Id(self.0.wrapping_add(1u8.wrapping_shl(i)))
    }

    /// The raw byte value.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for Id {
    fn from(v: u8) -> Self {
        Id(v)
    }
}

/// The 20-byte SHA-1 digest of some name or address+port byte-string, plus
/// the reduction to an [`Id`] and the three Bloom projections. Every place
/// this crate needs "hash bytes to an ID" or "hash bytes to Bloom bits"
/// goes through this type so the reduction can never drift between call
/// sites.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Digest([u8; 20]);

impl Digest {
    /// Hash raw bytes with SHA-1.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        let out = hasher.finalize();
        let mut buf = [0u8; 20];
        buf.copy_from_slice(&out);
        Digest(buf)
    }

    /// The raw 20 digest bytes.
    pub fn bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Reduce to an 8-bit [`Id`]: the top-most byte of the digest (spec §4.1).
    pub fn to_id(&self) -> Id {
        Id(self.0[0])
    }

    /// The three independent 6-bit Bloom projections (spec §3, "Bloom
    /// projection"). `hash.h` from the original implementation was not part
    /// of the retrieved source, so the exact byte offsets it used are not
    /// recoverable; this picks three well-separated bytes of the digest and
    /// masks each to 6 bits, which satisfies the only documented
    /// requirement — independence and determinism (see DESIGN.md).
    pub fn bloom_projections(&self) -> [u8; 3] {
        [self.0[1] & 0x3F, self.0[7] & 0x3F, self.0[13] & 0x3F]
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Hash a name to its object [`Id`] (spec §4.1 `hash_id`).
pub fn hash_id(name: &str) -> Id {
    Digest::of(name.as_bytes()).to_id()
}

/// The half-open, wrapping `(lo, hi]` predicate (spec §3, §4.1).
///
/// When `lo == hi` the range is the whole circle and every `x` is in range.
pub fn in_range(x: Id, lo: Id, hi: Id) -> bool {
    if lo == hi {
        return true;
    }
    if lo.0 < hi.0 {
        x.0 > lo.0 && x.0 <= hi.0
    } else {
        // Wraps around 255 -> 0.
        x.0 > lo.0 || x.0 <= hi.0
    }
}
