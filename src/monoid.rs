// model = "claude-opus-4-5"
// created = "2026-08-08"
// modified = "2026-08-08"
// driver = "Isaac Clayton"

//! Monoids for folding leaf payloads into subtree summaries.
//!
//! A monoid bundles three things: an associative combine operation, its
//! identity element, and a function that extracts a value from one leaf
//! payload. The definition is a plain value handed to every
//! [`aggregate`](crate::tree::Tree::aggregate) call, so an application can
//! define one per query (length, line count, checksum) and reuse it across
//! trees.
//!
//! Correctness requirements on implementors:
//! - `combine` is associative and `identity` is its unit.
//! - `combine` and `extract` are pure. The memo cache assumes that two
//!   evaluations over the same subtree content produce equal values.
//!
//! The cache is keyed by the monoid's Rust type, so each monoid should be
//! its own (usually zero-sized) type.

/// An associative operation with identity, plus leaf extraction.
pub trait Monoid<P>: 'static {
    /// The summary value produced by this monoid.
    type Value: Clone + 'static;

    /// The identity element: `combine(identity(), v) == v`.
    fn identity(&self) -> Self::Value;

    /// Combine two summaries. Must be associative.
    fn combine(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Extract a summary from one leaf payload.
    fn extract(&self, payload: &P) -> Self::Value;
}

/// Counts leaves. The weight every payload contributes is 1.
pub struct Count;

impl<P> Monoid<P> for Count {
    type Value = usize;

    fn identity(&self) -> usize {
        return 0;
    }

    fn combine(&self, a: &usize, b: &usize) -> usize {
        return a + b;
    }

    fn extract(&self, _payload: &P) -> usize {
        return 1;
    }
}

/// Total byte length of all payloads.
pub struct ByteLen;

impl<P: AsRef<[u8]>> Monoid<P> for ByteLen {
    type Value = usize;

    fn identity(&self) -> usize {
        return 0;
    }

    fn combine(&self, a: &usize, b: &usize) -> usize {
        return a + b;
    }

    fn extract(&self, payload: &P) -> usize {
        return payload.as_ref().len();
    }
}

/// Newline count, the line-index summary for a text buffer.
pub struct Lines;

impl<P: AsRef<str>> Monoid<P> for Lines {
    type Value = usize;

    fn identity(&self) -> usize {
        return 0;
    }

    fn combine(&self, a: &usize, b: &usize) -> usize {
        return a + b;
    }

    fn extract(&self, payload: &P) -> usize {
        return payload.as_ref().bytes().filter(|&b| b == b'\n').count();
    }
}

/// Content checksum: per-leaf blake3 hashes folded with xor.
///
/// Xor keeps the combine associative, so the result is independent of how
/// the tree groups its children. Identical payloads cancel pairwise; pair
/// with [`ByteLen`] or [`Count`] if that matters for change detection.
pub struct Checksum;

impl<P: AsRef<[u8]>> Monoid<P> for Checksum {
    type Value = u64;

    fn identity(&self) -> u64 {
        return 0;
    }

    fn combine(&self, a: &u64, b: &u64) -> u64 {
        return a ^ b;
    }

    fn extract(&self, payload: &P) -> u64 {
        let hash = blake3::hash(payload.as_ref());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        return u64::from_le_bytes(bytes);
    }
}
