//! HTTP server implementation for microstatic-rs.
//!
//! The pieces, in the order a connection meets them: the [`Listener`]
//! accepts sockets and pushes them into a bounded job queue, a fixed
//! [`WorkerPool`] drains the queue, and each worker runs the
//! [`ConnectionHandler`], which parses requests and answers them from the
//! document root.

mod config;
mod connection;
mod error;
mod handler;
mod http_server;
mod listener;
mod mime;
mod path;
mod pool;
mod response;
mod static_files;
mod tests;

// Re-export public items
pub use config::ServerConfig;
pub use connection::{Connection, ConnectionHandler};
pub use error::{parse_error_status, Error, ResourceError, WriteError};
pub use handler::{job_handler, static_file_handler, JobFuture, JobHandler};
pub use http_server::{HttpServer, ServerHandle};
pub use listener::Listener;
pub use mime::{mime_type_for, DEFAULT_MIME_TYPE};
pub use path::{normalize, percent_decode, resolve_under};
pub use pool::{job_queue, JobReceiver, JobSender, WorkerPool};
pub use response::{Body, HttpResponse, StatusCode};
pub use static_files::{error_response, resolve, respond, ResolvedResource, ALLOWED_METHODS};
