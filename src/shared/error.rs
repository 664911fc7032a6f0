use std::fmt;

#[derive(Debug)]
pub enum AppError {
    PayloadTooLarge { size: usize, limit: usize },
    NotAuthenticated(String),
    NotFound(String),
    UploadFailed(String),
    RemoteWriteFailed(String),
    LocalStoreUnavailable(String),
    ValidationError(String),
    InvalidTransition(String),
    Database(String),
    Storage(String),
    Network(String),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
    Internal(String),
}

impl AppError {
    /// Failures that leave the local tier untouched and can be retried later.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            AppError::UploadFailed(_) | AppError::RemoteWriteFailed(_) | AppError::Network(_)
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::PayloadTooLarge { size, limit } => {
                write!(f, "Payload too large: {} bytes (limit {})", size, limit)
            }
            AppError::NotAuthenticated(msg) => write!(f, "Not authenticated: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::UploadFailed(msg) => write!(f, "Upload failed: {}", msg),
            AppError::RemoteWriteFailed(msg) => write!(f, "Remote write failed: {}", msg),
            AppError::LocalStoreUnavailable(msg) => {
                write!(f, "Local store unavailable: {}", msg)
            }
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::LocalStoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
