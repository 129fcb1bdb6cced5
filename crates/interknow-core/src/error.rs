//! Error types for InterKnow

use thiserror::Error;

/// Result type alias using InterKnow's Error
pub type Result<T> = std::result::Result<T, Error>;

/// InterKnow error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Upstream generation errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Run `interknow doctor` to check your API key.")]
    LLMError(String),

    #[error("Generation call timed out after {0} seconds")]
    GenerationTimeout(u64),

    // Graph structure errors (E300-E399)
    #[error("Malformed graph output: {0}")]
    Structure(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid membership filter configuration: {0}")]
    InvalidFilterConfig(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::GenerationTimeout(_) => "E102",
            Self::Structure(_) => "E300",
            Self::DatabaseError(_) => "E400",
            Self::Serialization(_) => "E401",
            Self::ConfigError(_) => "E600",
            Self::InvalidFilterConfig(_) => "E601",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("interknow doctor".to_string()),
            Self::GenerationTimeout(secs) => Some(format!(
                "interknow config set generation.call_timeout_secs {}",
                secs * 2
            )),
            Self::InvalidFilterConfig(_) => Some("interknow config list".to_string()),
            Self::DatabaseError(_) => Some("interknow doctor".to_string()),
            _ => None,
        }
    }
}
