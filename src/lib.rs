//! A minimal static file HTTP/1.x server.
//!
//! This library accepts raw TCP connections, parses requests with its own
//! byte-level state machine, and serves files from a document root.
//!
//! # Features
//!
//! - Incremental HTTP/1.0 and HTTP/1.1 request parsing with size limits
//! - `GET` and `HEAD` for static files, `405` for every other method
//! - Path traversal protection that does not depend on the filesystem
//! - MIME types from a static extension table
//! - Keep-alive with a per-connection request limit
//! - A fixed worker pool fed by a bounded queue, so overload slows the
//!   accept loop down instead of piling up connections
//!
//! # Examples
//!
//! ## Parsing a request
//!
//! ```
//! use microstatic_rs::{parse_request, Method};
//!
//! let request_bytes = b"GET /index.html?lang=en HTTP/1.1\r\nHost: example.com\r\n\r\n";
//!
//! let request = parse_request(request_bytes).unwrap();
//! assert_eq!(request.method, Method::GET);
//! assert_eq!(request.path, "/index.html");
//! assert_eq!(request.query.as_deref(), Some("lang=en"));
//! assert_eq!(request.get_header("host"), Some("example.com"));
//! ```
//!
//! ## Error handling
//!
//! ```
//! use microstatic_rs::{parse_error_status, parse_request, StatusCode};
//!
//! let err = parse_request(b"GET /index.html HTTP/9.9\r\n\r\n").unwrap_err();
//! assert_eq!(parse_error_status(&err), Some(StatusCode::BadRequest));
//! ```
//!
//! ## Running a server
//!
//! ```no_run
//! use microstatic_rs::{HttpServer, ServerConfig};
//!
//! # async fn run() -> Result<(), microstatic_rs::ServerError> {
//! let config = ServerConfig {
//!     bind_port: 8080,
//!     document_root: "/var/www".into(),
//!     worker_count: 8,
//!     ..ServerConfig::default()
//! };
//!
//! let server = HttpServer::bind(config).await?;
//! let handle = server.handle();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     handle.stop();
//! });
//! server.run().await
//! # }
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{parse_request, Error as ParserError, Headers, HttpRequest, HttpVersion, Method, ParserLimits};
pub use server::{
    parse_error_status, Error as ServerError, HttpResponse, HttpServer, ServerConfig, ServerHandle, StatusCode,
};
