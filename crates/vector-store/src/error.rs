use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid vector dimension in cluster {cluster}: expected {expected}, got {actual}")]
    InvalidDimension {
        cluster: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid cluster {cluster}: {reason}")]
    InvalidCluster { cluster: String, reason: String },

    #[error("Cluster not found: {0}")]
    NotFound(String),
}

impl VectorStoreError {
    pub fn invalid_cluster(cluster: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCluster {
            cluster: cluster.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::IoError(_) => "io_error",
            Self::SerializationError(_) => "invalid_json",
            Self::InvalidDimension { .. } => "invalid_dimension",
            Self::InvalidCluster { .. } => "invalid_cluster",
            Self::NotFound(_) => "unknown_cluster",
        }
    }
}
