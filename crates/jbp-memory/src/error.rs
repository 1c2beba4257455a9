/// Errors parsing human-friendly byte sizes and percentages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseByteSizeError {
    #[error("empty size")]
    Empty,

    #[error("invalid size {0:?}: expected a number optionally followed by k, m, g or t")]
    InvalidNumber(String),

    #[error("invalid size {0:?}: unknown unit suffix")]
    UnknownSuffix(String),

    #[error("size {0:?} does not fit in 64 bits")]
    Overflow(String),

    #[error("invalid percentage {0:?}: expected a value between 0% and 100%")]
    InvalidPercentage(String),
}

/// Failures of [`crate::MemoryResolver`]. Resolution either returns a complete
/// result or one of these; it never partially succeeds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Explicit sizes (or enforced minimums) need more than the budget.
    #[error("insufficient memory: {required} bytes required but the budget is {budget} bytes")]
    InsufficientMemory { required: u64, budget: u64 },

    #[error("invalid memory weight: {message}")]
    InvalidWeight { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitError {
    #[error("invalid {var} value {raw:?}: {source}")]
    Invalid {
        var: &'static str,
        raw: String,
        #[source]
        source: ParseByteSizeError,
    },
}

/// Failures of a [`crate::MemoryHeuristic`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeuristicError {
    #[error(transparent)]
    Limit(#[from] LimitError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
