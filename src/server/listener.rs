//! Accept loop feeding the job queue.

use std::io;

use log::{debug, error, info, warn};
use tokio::net::{lookup_host, TcpListener, TcpSocket};
use tokio::sync::mpsc;

use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::error::Error;
use crate::server::pool::JobSender;

/// Owns the listening socket and the producer side of the job queue.
pub struct Listener {
    listener: TcpListener,
    jobs: JobSender,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Listener {
    /// Bind the listening socket with the configured backlog.
    ///
    /// Every failure here is fatal and reported as [`Error::Bind`].
    pub async fn bind(config: &ServerConfig) -> Result<TcpListener, Error> {
        let address = config.address();
        let bind_error = |source: io::Error| Error::Bind {
            addr: address.clone(),
            source,
        };

        let addr = lookup_host(&address)
            .await
            .map_err(bind_error)?
            .next()
            .ok_or_else(|| bind_error(io::Error::new(io::ErrorKind::AddrNotAvailable, "host has no address")))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;

        let backlog = u32::try_from(config.backlog).unwrap_or(u32::MAX);
        let listener = socket.listen(backlog).map_err(bind_error)?;
        info!(
            "Server listening on http://{addr} (backlog {backlog})",
            addr = listener.local_addr().map_err(bind_error)?
        );
        Ok(listener)
    }

    pub fn new(listener: TcpListener, jobs: JobSender, shutdown_rx: mpsc::Receiver<()>) -> Self {
        Self {
            listener,
            jobs,
            shutdown_rx,
        }
    }

    /// Accept connections until a stop signal arrives.
    ///
    /// A full job queue blocks this loop, so no new client is accepted until
    /// a worker frees a slot. On return the listening socket and the queue
    /// sender are dropped, which lets the workers drain and exit.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(()) = self.shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {peer}");
                            let connection = Connection::new(stream, peer);
                            tokio::select! {
                                sent = self.jobs.send(connection) => {
                                    if sent.is_err() {
                                        error!("Job queue closed, no workers left; stopping accept loop");
                                        break;
                                    }
                                }
                                Some(()) = self.shutdown_rx.recv() => {
                                    info!("Shutting down server while the job queue is full...");
                                    break;
                                }
                            }
                        }
                        Err(e) => Self::handle_accept_error(e).await,
                    }
                }
            }
        }
    }

    /// Log a failed accept and pause briefly before trying again.
    ///
    /// Accept failures are per connection or transient (descriptor
    /// exhaustion, aborted handshakes), so the loop keeps going.
    async fn handle_accept_error(e: io::Error) {
        warn!("Error accepting connection: {e}");
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
