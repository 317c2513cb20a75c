use thiserror::Error;
use votematch_protocol::BillId;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid dimension count: {0} (must be > 0)")]
    InvalidDimension(usize),

    #[error("Unknown bill {bill_id} in cluster {cluster}")]
    UnknownBill { cluster: String, bill_id: BillId },

    #[error("Invalid score {0}: must be a finite value in [-1, 1]")]
    InvalidScore(f32),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid importance {0}: must be between 1 and 5")]
    InvalidImportance(u8),

    #[error("Unknown cluster: {0}")]
    UnknownCluster(String),

    #[error("Cluster {0} appears more than once")]
    DuplicateCluster(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl EngineError {
    pub fn unknown_bill(cluster: impl Into<String>, bill_id: BillId) -> Self {
        Self::UnknownBill {
            cluster: cluster.into(),
            bill_id,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Stable machine-readable code for error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDimension(_) => "invalid_dimension",
            Self::UnknownBill { .. } => "unknown_bill",
            Self::InvalidScore(_) => "invalid_score",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::InvalidImportance(_) => "invalid_importance",
            Self::UnknownCluster(_) => "unknown_cluster",
            Self::DuplicateCluster(_) => "duplicate_cluster",
            Self::SessionNotFound(_) => "session_not_found",
            Self::InvalidConfig(_) | Self::ConfigParse(_) => "invalid_config",
            Self::IoError(_) => "io_error",
        }
    }
}
