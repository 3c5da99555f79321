use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Admin password not provided")]
    AuthenticationMissing,

    #[error("Access denied")]
    AuthenticationDenied,

    #[error("Authentication failed: {message}")]
    AuthenticationSystem { message: String },

    #[error("Too many authentication attempts, try again later")]
    TooManyAttempts,

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("{entity} '{id}' was modified by another request")]
    Conflict { entity: &'static str, id: String },

    #[error("{service} error: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
