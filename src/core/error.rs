use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Cache backend errors (never fatal; callers degrade to the database)
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// A requested entity (file code, channel, user) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// User-supplied input failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An upload-session operation was issued with no active session
    #[error("No active upload session")]
    NoActiveSession,

    /// A write to durable storage failed mid-operation
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Short user-facing description, without internal details.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Nothing found for that code.",
            Self::InvalidInput(_) => "That doesn't look right. Please check the input and try again.",
            Self::NoActiveSession => "There is no active upload session. Press the upload button first.",
            Self::Persistence(_) => "Saving failed. The upload was cancelled, please try again.",
            _ => "Something went wrong. Please try again later.",
        }
    }
}
