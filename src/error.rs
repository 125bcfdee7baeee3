//! Error Module
//!
//! One closed error type for every failure the updater can hit.

use std::fmt;

/// Failure category, used for log classification and exit decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Auth,
    Transport,
    HttpStatus,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::Auth => "auth",
            ErrorKind::Transport => "transport",
            ErrorKind::HttpStatus => "http-status",
        };
        f.write_str(name)
    }
}

/// Updater errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP status {code} from {url}")]
    HttpStatus { code: u16, url: String },
}

impl Error {
    /// The taxonomy case this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Transport(_) => ErrorKind::Transport,
            Error::HttpStatus { .. } => ErrorKind::HttpStatus,
        }
    }

    /// Status code when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Flatten the source chain into the message
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Error::Transport(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
