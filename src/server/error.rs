//! Error types for the HTTP server.

use std::path::PathBuf;

use thiserror::Error;

use crate::parser::Error as ParserError;
use crate::server::response::StatusCode;

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be set up. Fatal at startup.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The document root does not exist or is not a directory.
    #[error("Document root {} is not an existing directory: {reason}", .path.display())]
    InvalidDocumentRoot { path: PathBuf, reason: String },

    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`ServerConfig`](crate::ServerConfig).
    #[error("Config file error: {0}")]
    ConfigFile(#[from] serde_json::Error),
}

/// Why a request could not be answered with a file.
///
/// These never escape the responder; each one becomes a status response.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("Bad request path: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] std::io::Error),
}

impl ResourceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ResourceError::NotFound(_) => StatusCode::NotFound,
            ResourceError::Forbidden(_) => StatusCode::Forbidden,
            ResourceError::MethodNotAllowed(_) => StatusCode::MethodNotAllowed,
            ResourceError::BadRequest(_) => StatusCode::BadRequest,
            ResourceError::Internal(_) => StatusCode::InternalServerError,
        }
    }
}

/// Status answered for a parse failure, or `None` when the connection
/// should just be closed.
pub fn parse_error_status(error: &ParserError) -> Option<StatusCode> {
    match error {
        ParserError::BadRequest(_) => Some(StatusCode::BadRequest),
        ParserError::HeaderTooLarge => Some(StatusCode::RequestHeaderFieldsTooLarge),
        ParserError::UriTooLong => Some(StatusCode::UriTooLong),
        ParserError::Timeout => Some(StatusCode::RequestTimeout),
        ParserError::ConnectionClosed | ParserError::Io(_) => None,
    }
}

/// Failure while sending a response.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The client went away or stopped reading. Not worth reporting.
    #[error("Writing to the client failed: {0}")]
    Peer(#[source] std::io::Error),

    /// The response body could not be read from its source.
    #[error("Reading the response body failed: {0}")]
    Body(#[source] std::io::Error),
}
