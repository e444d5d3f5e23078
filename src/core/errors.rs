use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Extraction failure: required field '{field}' not found")]
    Extraction { field: String },

    #[error("Unexpected status during {context}: {status}")]
    UnexpectedStatus { context: String, status: u16 },

    #[error("Signing misconfiguration: {0}")]
    SigningMisconfiguration(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Cannot {operation} while session is {state}")]
    InvalidState { operation: String, state: String },

    #[error("Invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}

impl SessionError {
    pub fn extraction(field: impl Into<String>) -> Self {
        Self::Extraction {
            field: field.into(),
        }
    }

    pub fn unexpected_status(context: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            context: context.into(),
            status,
        }
    }

    /// Status code carried by an `UnexpectedStatus` error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
