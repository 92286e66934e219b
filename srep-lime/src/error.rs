//! Error types for srep-lime

use thiserror::Error;

/// LimeSurvey client errors
#[derive(Debug, Error)]
pub enum LimeError {
    /// Endpoint URL, username or password missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote rejected the credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A call was attempted without a session key
    #[error("Not authenticated: log in before calling '{0}'")]
    NotAuthenticated(String),

    #[error("Network error: {0}")]
    Transport(String),

    /// Response was not a well-formed JSON-RPC reply
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected format: {0}")]
    UnexpectedFormat(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("No surveys returned from LimeSurvey")]
    NoSurveys,

    #[error("No survey found for school number {school_number} (ubb={is_ubb})")]
    SurveyNotFound { school_number: String, is_ubb: bool },

    #[error("No completed responses available for school number {school_number} (ubb={is_ubb})")]
    NoCompletedResponses { school_number: String, is_ubb: bool },
}

impl From<srep_common::Error> for LimeError {
    fn from(err: srep_common::Error) -> Self {
        match err {
            srep_common::Error::Config(msg) => LimeError::Configuration(msg),
            other => LimeError::Configuration(format!("failed to load settings: {}", other)),
        }
    }
}

/// Result type for LimeSurvey client operations
pub type LimeResult<T> = Result<T, LimeError>;
