//! Error types for the LMS server
//!
//! Provides a unified error type for all operations, plus the mapping from
//! each failure onto the closed set of wire error codes.

use thiserror::Error;

use crate::protocol::ErrorCode;

/// Result type alias using LmsError
pub type Result<T> = std::result::Result<T, LmsError>;

/// Unified error type for LMS server operations
#[derive(Debug, Error)]
pub enum LmsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Header line exceeds {limit} bytes")]
    HeaderTooLong { limit: usize },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    // -------------------------------------------------------------------------
    // Transfer Errors
    // -------------------------------------------------------------------------
    #[error("Invalid declared file size: {0:?}")]
    BadFileSize(String),

    #[error("Declared file size {size} exceeds limit of {limit} bytes")]
    InvalidSize { size: u64, limit: u64 },

    #[error("Peer closed after {received} of {expected} bytes")]
    PrematureEof { received: u64, expected: u64 },

    #[error("File receive failed: {0}")]
    Receive(String),

    #[error("File send failed: {0}")]
    Transfer(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Metadata Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // -------------------------------------------------------------------------
    // HTTP Errors
    // -------------------------------------------------------------------------
    #[error("Malformed HTTP request: {0}")]
    Http(String),

    #[error("Unsatisfiable range: {0}")]
    InvalidRange(String),

    // -------------------------------------------------------------------------
    // Client Errors
    // -------------------------------------------------------------------------
    #[error("Server replied with error: {0}")]
    Remote(String),

    #[error("Unexpected reply: {0:?}")]
    UnexpectedReply(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LmsError {
    /// The stable wire code reported to the peer for this failure.
    ///
    /// Only the code crosses the wire; the display text stays in the logs.
    pub fn code(&self) -> ErrorCode {
        match self {
            LmsError::BadRequest(_) | LmsError::HeaderTooLong { .. } => ErrorCode::BadRequest,
            LmsError::UnknownCommand(_) => ErrorCode::UnknownCommand,
            LmsError::InvalidCredentials => ErrorCode::InvalidCredentials,
            LmsError::BadFileSize(_) => ErrorCode::BadFileSize,
            LmsError::InvalidSize { .. } => ErrorCode::InvalidSize,
            LmsError::PrematureEof { .. } | LmsError::Receive(_) => ErrorCode::FileRecvError,
            LmsError::Transfer(_) => ErrorCode::TransferError,
            LmsError::NotFound(_) => ErrorCode::NotFound,
            LmsError::Store(_) => ErrorCode::DbError,
            LmsError::Io(_)
            | LmsError::Internal(_)
            | LmsError::Http(_)
            | LmsError::InvalidRange(_)
            | LmsError::Remote(_)
            | LmsError::UnexpectedReply(_)
            | LmsError::Config(_) => ErrorCode::ServerError,
        }
    }

    /// Whether this failure was caused by the peer rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LmsError::BadRequest(_)
                | LmsError::HeaderTooLong { .. }
                | LmsError::UnknownCommand(_)
                | LmsError::InvalidCredentials
                | LmsError::BadFileSize(_)
                | LmsError::InvalidSize { .. }
                | LmsError::PrematureEof { .. }
                | LmsError::NotFound(_)
        )
    }
}
