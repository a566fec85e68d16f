//! Errors for structural operations that violate slot preconditions.

use thiserror::Error;

/// A precondition violation on an internal node's child slots.
///
/// These are programmer-contract errors, not recoverable runtime faults:
/// callers are expected to validate sizes and positions before calling, and
/// must not use these variants for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A slot index outside the fixed 0..4 slot range.
    #[error("slot {0} is out of range (an internal node has 4 slots)")]
    InvalidIndex(usize),

    /// An insert into a node that already holds 4 children.
    #[error("node already holds 4 children")]
    Overflow,

    /// An insert position past the current size, which would leave a gap.
    #[error("position {pos} would skip slots (current size is {size})")]
    InvalidPosition { pos: usize, size: usize },
}
