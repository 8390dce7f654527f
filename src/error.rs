use indicatif::style::TemplateError;
use thiserror::Error;

pub type DynaqResult<T> = Result<T, DynaqError>;

#[derive(Debug, Error)]
pub enum DynaqError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Learn(#[from] LearnError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors related to input tables, feature rows, and state keys.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("feature table is empty")]
    EmptyFeatureTable,

    #[error(
        "feature table and price series are misaligned: {features} feature rows vs {prices} price rows"
    )]
    RowCountMismatch { features: usize, prices: usize },

    #[error("feature row {row} does not match the table's feature names")]
    InconsistentRow { row: usize },

    #[error("duplicate feature name '{0}'")]
    DuplicateFeature(String),

    #[error("feature name '{0}' is reserved for the position flags")]
    ReservedFeature(String),

    #[error("non-finite value for feature '{0}'")]
    NonFiniteFeature(String),

    #[error("invalid close price at index {index}: {price}")]
    InvalidPrice { index: usize, price: f64 },

    #[error("no price row at index {0}")]
    MissingPrice(usize),

    #[error("invalid state key '{key}': {msg}")]
    InvalidStateKey { key: String, msg: String },

    #[error(
        "rolling window must be positive and no longer than the series (len {len}), got {window}"
    )]
    InvalidWindow { window: usize, len: usize },

    #[error("policy and market metadata differ: {0}")]
    MetadataMismatch(String),
}

/// Errors raised by the learning loops and their invariants.
#[derive(Debug, Error)]
pub enum LearnError {
    #[error("invalid train config: {0}")]
    InvalidConfig(String),

    #[error("state '{0}' has no initialized value entries")]
    UninitializedState(String),

    #[error("action '{action}' was never initialized for state '{key}'")]
    UninitializedAction { key: String, action: String },

    #[error("no best-case portfolio recorded for state '{key}' at index {index}")]
    MissingBestCase { index: usize, key: String },

    #[error("portfolio value is zero, reward is undefined (initial cash must be positive)")]
    ZeroPortfolioValue,

    #[error("no state follows index {0}; check has_next before transitioning")]
    TerminalTransition(usize),

    #[error("progress bar template")]
    ProgressBar(#[from] TemplateError),
}

/// Errors related to artifact reading and writing.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("serialization failed")]
    Json(#[from] serde_json::Error),
}
