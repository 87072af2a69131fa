//! Connection handler function types used by the worker pool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::server::connection::{Connection, ConnectionHandler};
use crate::server::error::Error;

/// Type alias for a boxed future that serves one connection.
pub type JobFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;

/// Type alias for the function a worker runs on every dequeued connection.
pub type JobHandler = Arc<dyn Fn(Connection) -> JobFuture + Send + Sync>;

/// Wrap a closure returning a future into a [`JobHandler`].
pub fn job_handler<F, Fut>(handler: F) -> JobHandler
where
    F: Fn(Connection) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    Arc::new(move |connection: Connection| -> JobFuture { Box::pin(handler(connection)) })
}

/// The handler used by the server: serve static files on the connection.
pub fn static_file_handler(handler: Arc<ConnectionHandler>) -> JobHandler {
    job_handler(move |connection| {
        let handler = Arc::clone(&handler);
        async move { handler.serve(connection).await }
    })
}
