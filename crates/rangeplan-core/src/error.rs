use thiserror::Error as ThisError;

///
/// RangeError
///
/// Structured analysis error with a stable internal classification.
/// Every variant except `Internal` is recoverable: the public entry point
/// translates it into "no range access" plus a warning, never a query
/// failure.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RangeError {
    /// The arena byte budget was exhausted while building interval graphs.
    #[error("interval graph memory budget of {budget} bytes exceeded")]
    BudgetExceeded { budget: usize },

    /// Predicate or interval nesting exceeded the configured depth cap.
    #[error("recursion depth cap of {cap} exceeded")]
    DepthExceeded { cap: u32 },

    /// The caller's cooperative abort flag was raised mid-analysis.
    #[error("range analysis aborted by caller")]
    Aborted,

    /// A graph invariant was violated; indicates a bug, not bad input.
    #[error("{0}")]
    Internal(Box<InternalError>),
}

impl RangeError {
    /// True when the error degrades to a full scan rather than surfacing.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

impl From<InternalError> for RangeError {
    fn from(err: InternalError) -> Self {
        Self::Internal(Box::new(err))
    }
}

///
/// InternalError
///
/// Invariant-violation report produced by graph consistency checks.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("graph invariant violated: {message}")]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub(crate) fn graph_invariant(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
