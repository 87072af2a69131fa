//! Error types for the HTTP parser.

use thiserror::Error;

/// Errors that can occur while reading and parsing an HTTP request.
#[derive(Debug, Error)]
pub enum Error {
    /// The request is malformed: bad request line, bad header, bad framing.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The header section exceeds the configured size or count limit.
    #[error("Request header fields too large")]
    HeaderTooLarge,

    /// The request line exceeds the configured length limit.
    #[error("Request line too long")]
    UriTooLong,

    /// A single read stalled for longer than the idle timeout.
    #[error("Timed out waiting for request data")]
    Timeout,

    /// The peer closed the connection before sending any bytes.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// I/O error while reading from the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn bad_request(reason: impl Into<String>) -> Self {
        Error::BadRequest(reason.into())
    }
}
