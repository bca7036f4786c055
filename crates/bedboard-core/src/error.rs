use thiserror::Error;

/// Core error types for bedboard operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Hospital record not found: {id}")]
    RecordNotFound { id: String },

    #[error("Bed count out of range for {hospital}: {attempted_available} / {total}")]
    BoundsViolation {
        hospital: String,
        attempted_available: i64,
        total: u32,
    },

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Subscription read error: {0}")]
    Subscription(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new RecordNotFound error
    pub fn record_not_found(id: impl Into<String>) -> Self {
        Self::RecordNotFound { id: id.into() }
    }

    /// Create a new BoundsViolation error
    pub fn bounds_violation(
        hospital: impl Into<String>,
        attempted_available: i64,
        total: u32,
    ) -> Self {
        Self::BoundsViolation {
            hospital: hospital.into(),
            attempted_available,
            total,
        }
    }

    /// Create a new Transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    /// Create a new Subscription error
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription(message.into())
    }

    /// Check if this error is recovered locally with a user-facing message
    /// (as opposed to being fatal or infrastructural)
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RecordNotFound { .. } | Self::BoundsViolation { .. }
        )
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::RecordNotFound { .. } => ErrorCategory::NotFound,
            Self::BoundsViolation { .. } => ErrorCategory::Bounds,
            Self::Transaction(_) => ErrorCategory::Transaction,
            Self::Subscription(_) => ErrorCategory::Subscription,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    NotFound,
    Bounds,
    Transaction,
    Subscription,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::NotFound => write!(f, "not_found"),
            Self::Bounds => write!(f, "bounds"),
            Self::Transaction => write!(f, "transaction"),
            Self::Subscription => write!(f, "subscription"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
