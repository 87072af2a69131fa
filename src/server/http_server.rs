//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::server::config::ServerConfig;
use crate::server::connection::ConnectionHandler;
use crate::server::error::Error;
use crate::server::handler::static_file_handler;
use crate::server::listener::Listener;
use crate::server::pool::{job_queue, WorkerPool};

/// How long `run` waits for workers to finish queued connections after a stop.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// A static file HTTP server.
pub struct HttpServer {
    /// The validated server configuration.
    config: Arc<ServerConfig>,
    listener: TcpListener,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Cloneable handle used to stop a running server.
#[derive(Clone)]
pub struct ServerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ServerHandle {
    /// Ask the server to stop accepting connections.
    ///
    /// Calling this more than once, or after the server has stopped, does
    /// nothing.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

impl HttpServer {
    /// Validate `config` and bind the listening socket.
    pub async fn bind(config: ServerConfig) -> Result<Self, Error> {
        let config = config.validate()?;
        let listener = Listener::bind(&config).await?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Ok(Self {
            config: Arc::new(config),
            listener,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Bind and serve until stopped.
    pub async fn start(config: ServerConfig) -> Result<(), Error> {
        Self::bind(config).await?.run().await
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The address actually bound, useful when the configured port was 0.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Display the effective settings.
    fn display_server_info(&self) {
        let config = &self.config;
        info!("Serving files from {}", config.document_root.display());
        info!(
            "{} workers, queue of {}, idle timeout {:?}, up to {} requests per connection",
            config.worker_count, config.backlog, config.idle_timeout, config.max_requests_per_connection
        );
    }

    /// Run the server: start the workers, then accept until stopped.
    ///
    /// After a stop the workers finish the connections already accepted,
    /// with a grace period before they are aborted.
    pub async fn run(self) -> Result<(), Error> {
        self.display_server_info();

        let (jobs, queue) = job_queue(self.config.backlog);
        let handler = static_file_handler(Arc::new(ConnectionHandler::new(Arc::clone(&self.config))));
        let pool = WorkerPool::spawn(self.config.worker_count, queue, handler)?;

        Listener::new(self.listener, jobs, self.shutdown_rx).run().await;

        pool.shutdown(SHUTDOWN_GRACE).await;
        info!("Server shutdown complete");
        Ok(())
    }
}
