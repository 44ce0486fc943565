//! Errors raised by the messaging platform.

use std::fmt;

/// A failure talking to the messaging platform.
#[derive(Debug)]
pub enum ClientError {
    /// A platform request failed.
    Request { op: &'static str, message: String },
    /// Local participant bookkeeping failed.
    Roster(rusqlite::Error),
}

impl ClientError {
    pub fn request(op: &'static str, err: impl fmt::Display) -> Self {
        Self::Request { op, message: err.to_string() }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { op, message } => write!(f, "{} failed: {}", op, message),
            Self::Roster(e) => write!(f, "roster lookup failed: {}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { .. } => None,
            Self::Roster(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for ClientError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Roster(e)
    }
}
