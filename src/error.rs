use thiserror::Error;

/// Result type for dashq operations
pub type Result<T> = std::result::Result<T, DashError>;

/// Main error type for the learning engine.
///
/// Every variant is recoverable: the control loop reports it and keeps
/// running with whatever parameters it currently holds.
#[derive(Debug, Error)]
pub enum DashError {
    /// A weight snapshot was produced by a differently sized network
    #[error("Network architecture mismatch: expected {expected}, found {found}")]
    ConfigMismatch {
        expected: String,
        found: String,
    },

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Action outside the network's output range
    #[error("Invalid action {action}: must be less than {max_actions}")]
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// An operation needed the value network before one was attached
    #[error("No value network attached")]
    MissingNetwork,
}

// Helper functions for common error patterns
impl DashError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DashError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DashError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn config_mismatch<S: Into<String>>(expected: S, found: S) -> Self {
        DashError::ConfigMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
