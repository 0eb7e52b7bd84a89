//! Error types.
//!
//! Expected edge cases (empty lists, stale keys, nothing pending) are not
//! errors: the operations report them through `bool` and `Option` results.
//! What remains are broken internal invariants, which end the session.

/// A broken [`InputList`](crate::InputList) invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// Gaps and contents do not alternate at `position`, or the list does not
    /// start and end with a gap.
    #[error("gap alternation broken at position {position}")]
    GapAlternation {
        /// Offending position.
        position: usize,
    },
    /// The order refers to an input the arena does not hold.
    #[error("position {position} refers to a missing input")]
    MissingInput {
        /// Offending position.
        position: usize,
    },
    /// The arena holds inputs that are not in the order.
    #[error("{count} inputs are not reachable from the order")]
    OrphanInputs {
        /// Number of unreachable inputs.
        count: usize,
    },
    /// The input at `position` is paired with an input that is not in the list.
    #[error("input at position {position} is paired with a missing input")]
    DanglingPair {
        /// Offending position.
        position: usize,
    },
    /// The partner of the input at `position` does not point back to it.
    #[error("pair of the input at position {position} is not mutual")]
    AsymmetricPair {
        /// Offending position.
        position: usize,
    },
    /// A pending overlay is keyed to an input that is not in the list.
    #[error("pending overlay keyed to a missing input")]
    DanglingPending,
    /// The pending overlay at `position` is a gap.
    #[error("pending overlay at position {position} is a gap")]
    PendingGap {
        /// Offending position.
        position: usize,
    },
    /// The selection refers to an input that is not in the list.
    #[error("selection refers to a missing input")]
    DanglingSelection,
    /// The nested list of the math expression at `position` is broken.
    #[error("math expression at position {position}: {source}")]
    InMathExpr {
        /// Position of the math expression.
        position: usize,
        /// What is broken inside it.
        source: Box<InvariantViolation>,
    },
}

/// Errors surfaced by [`ImeSession`](crate::ImeSession).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImeError {
    /// A dispatch left the input list broken.
    #[error("input list invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
    /// The session was aborted by an earlier invariant violation.
    #[error("session aborted after an invariant violation")]
    SessionAborted,
}
