use thiserror::Error;

/// Coarse classification of a [`DiagnosticsError`], naming which
/// precondition of a diagnostics run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A sequence or chain is too short for the requested lag or thinning.
    InsufficientData,
    /// The chain matrix is empty or not rectangular.
    Shape,
    /// Within-chain variance is zero, so R hat is undefined.
    DegenerateVariance,
    /// A table handed to a collaborator is missing a required field.
    Schema,
    /// An option or input value is outside its domain.
    InvalidArgument,
    /// A visualization or export collaborator failed.
    Collaborator,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagnosticsError {
    #[error("sequence of length {len} is too short for max lag {max_lag}")]
    InsufficientLag { len: usize, max_lag: usize },

    #[error("chain {chain} has {len} samples, at least {required} are required")]
    InsufficientSamples {
        chain: usize,
        len: usize,
        required: usize,
    },

    #[error("need at least {required} values, got {len}")]
    TooFewValues { len: usize, required: usize },

    #[error("chain matrix contains no chains")]
    NoChains,

    #[error("chain {chain} has {found} samples but chain 0 has {expected}")]
    Ragged {
        chain: usize,
        expected: usize,
        found: usize,
    },

    #[error("within-chain variance is {within}, scale reduction is undefined")]
    DegenerateVariance { within: f64 },

    #[error("table is missing required field `{field}`")]
    MissingField { field: String },

    #[error("column `{field}` has {found} rows, expected {expected}")]
    ColumnLength {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("column `{field}` does not hold {expected} values")]
    ColumnType {
        field: String,
        expected: &'static str,
    },

    #[error("thinning factor must be at least 1")]
    InvalidThinning,

    #[error("percentile {0} is outside [0, 100]")]
    InvalidPercentile(f64),

    #[error("value {value} at chain {chain}, sample {sample} is not finite")]
    NonFinite {
        chain: usize,
        sample: usize,
        value: f64,
    },

    #[error("{target} renderer failed: {message}")]
    Render {
        target: &'static str,
        message: String,
    },
}

impl DiagnosticsError {
    pub fn kind(&self) -> ErrorKind {
        use DiagnosticsError::*;
        match self {
            InsufficientLag { .. } | InsufficientSamples { .. } | TooFewValues { .. } => {
                ErrorKind::InsufficientData
            }
            NoChains | Ragged { .. } => ErrorKind::Shape,
            DegenerateVariance { .. } => ErrorKind::DegenerateVariance,
            MissingField { .. } | ColumnLength { .. } | ColumnType { .. } => ErrorKind::Schema,
            InvalidThinning | InvalidPercentile(_) | NonFinite { .. } => ErrorKind::InvalidArgument,
            Render { .. } => ErrorKind::Collaborator,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiagnosticsError>;
