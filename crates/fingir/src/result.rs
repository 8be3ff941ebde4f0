//! Result and error types for Fingir.

use thiserror::Error;

/// Result type for Fingir operations
pub type FingirResult<T> = Result<T, FingirError>;

/// Errors that can occur while declaring, running, or verifying a sequence
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FingirError {
    /// Script-protocol violation: an out-of-order call, an over-budget call,
    /// or an unmet bound discovered at verification time
    #[error("expected invocation on the mock {expected}, but was {actual} times: {shape}")]
    Sequencing {
        /// Human-readable rendering of the violated bound, e.g. "exactly 1 times"
        expected: String,
        /// Observed invocation count for the step being cited
        actual: u64,
        /// The call shape of the step being cited
        shape: String,
    },

    /// A cyclical script recorded a different number of laps than expected
    #[error("Expected cycles {expected} but was {actual}")]
    CycleCount {
        /// Laps the caller expected
        expected: usize,
        /// Laps actually recorded
        actual: usize,
    },

    /// A step's match count for one lap differs from the expected count
    #[error("On cycle {cycle}. Expected invocation on the mock exactly {expected} times, but was {actual} times: {shape}")]
    CycleMismatch {
        /// Lap number (1-based) of the first mismatch
        cycle: usize,
        /// Expected match count for that lap
        expected: u64,
        /// Recorded match count for that lap
        actual: u64,
        /// The call shape of the step being cited
        shape: String,
    },

    /// The ledger holds invocations no sequence step ever claimed
    #[error("Expected no invocations without sequence setup but found {count}")]
    UnmatchedInvocations {
        /// Number of unclaimed ledger entries
        count: usize,
    },

    /// An invocation whose shape was never declared in the script
    /// (surfaced only under the strict policy)
    #[error("unexpected invocation without a matching sequence setup: {shape}")]
    UnexpectedInvocation {
        /// The undeclared call shape
        shape: String,
    },

    /// Construction-time or declaration-time misuse; fatal, never retried
    #[error("{message}")]
    Usage {
        /// What the caller did wrong
        message: String,
    },
}

/// Coarse classification of a [`FingirError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Script-protocol violations, raised regardless of strictness
    Sequencing,
    /// Undeclared-shape invocations, raised only under the strict policy
    Unexpected,
    /// API misuse during construction or the build phase
    Usage,
}

impl FingirError {
    /// Build a usage error from a message
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Which of the three error kinds this error belongs to
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Sequencing { .. }
            | Self::CycleCount { .. }
            | Self::CycleMismatch { .. }
            | Self::UnmatchedInvocations { .. } => ErrorKind::Sequencing,
            Self::UnexpectedInvocation { .. } => ErrorKind::Unexpected,
            Self::Usage { .. } => ErrorKind::Usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequencing_message_names_shape_and_bounds() {
        let err = FingirError::Sequencing {
            expected: "exactly 1 times".to_string(),
            actual: 0,
            shape: "alpha.Do(1)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "expected invocation on the mock exactly 1 times, but was 0 times: alpha.Do(1)"
        );
        assert_eq!(err.kind(), ErrorKind::Sequencing);
    }

    #[test]
    fn test_cycle_count_message() {
        let err = FingirError::CycleCount {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "Expected cycles 3 but was 2");
        assert_eq!(err.kind(), ErrorKind::Sequencing);
    }

    #[test]
    fn test_cycle_mismatch_message() {
        let err = FingirError::CycleMismatch {
            cycle: 2,
            expected: 1,
            actual: 4,
            shape: "beta.Run()".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "On cycle 2. Expected invocation on the mock exactly 1 times, but was 4 times: beta.Run()"
        );
    }

    #[test]
    fn test_unmatched_invocations_message() {
        let err = FingirError::UnmatchedInvocations { count: 2 };
        assert_eq!(
            err.to_string(),
            "Expected no invocations without sequence setup but found 2"
        );
        assert_eq!(err.kind(), ErrorKind::Sequencing);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            FingirError::UnexpectedInvocation {
                shape: "x".to_string()
            }
            .kind(),
            ErrorKind::Unexpected
        );
        assert_eq!(FingirError::usage("bad").kind(), ErrorKind::Usage);
    }
}
