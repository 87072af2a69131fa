//! HTTP parser module.
//!
//! This module turns raw connection bytes into [`HttpRequest`] values. It
//! works directly on bytes with a hand-written state machine and knows
//! nothing about files or responses.

mod error;
mod headers;
mod machine;
mod method;
mod request;
mod stream;
mod version;

// Re-export public items
pub use error::Error;
pub use headers::Headers;
pub use machine::{ParserLimits, RequestParser};
pub use method::Method;
pub use request::HttpRequest;
pub use version::HttpVersion;

// Re-export the parse functions
pub use stream::{parse_request, parse_request_with_limits, read_request, read_request_with};
