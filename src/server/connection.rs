//! Per-connection request loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::parser::{read_request_with, Error as ParserError, HttpRequest, HttpVersion, ParserLimits, RequestParser};
use crate::server::config::ServerConfig;
use crate::server::error::{parse_error_status, Error, WriteError};
use crate::server::static_files;

/// An accepted client socket waiting to be served.
///
/// Owned by exactly one party at a time: the listener, the job queue, then
/// the worker that dequeues it. Dropping it closes the socket.
#[derive(Debug)]
pub struct Connection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    pub accepted_at: Instant,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            accepted_at: Instant::now(),
        }
    }
}

/// Drives parse, respond and keep-alive for one connection at a time.
///
/// Holds only read-only settings, so a single instance is shared by every
/// worker.
#[derive(Debug)]
pub struct ConnectionHandler {
    config: Arc<ServerConfig>,
    limits: ParserLimits,
}

impl ConnectionHandler {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let limits = config.parser_limits();
        Self { config, limits }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve an accepted connection until it is done, then close it.
    pub async fn serve(&self, connection: Connection) -> Result<(), Error> {
        let Connection {
            mut stream,
            peer,
            accepted_at,
        } = connection;

        let result = self.handle(&mut stream, peer).await;
        // Best effort; the socket is closed when `stream` drops either way.
        let _ = stream.shutdown().await;
        debug!("Connection from {peer} closed after {:?}", accepted_at.elapsed());
        result
    }

    /// Run the request loop on any byte stream.
    ///
    /// Protocol and resource errors are answered on the stream and end in
    /// `Ok`. Only a failure on the server's side of a response, such as a
    /// file that cannot be read to the end, is returned as an error.
    pub async fn handle<S>(&self, stream: &mut S, peer: SocketAddr) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let mut served = 0usize;

        loop {
            let mut parser = RequestParser::new(self.limits);
            let request = match read_request_with(&mut parser, stream, &mut buf).await {
                Ok(request) => request,
                Err(e) => {
                    self.reject(stream, peer, e, parser.version()).await;
                    return Ok(());
                }
            };
            served += 1;

            let keep_alive = request.wants_keep_alive() && served < self.config.max_requests_per_connection;
            let response = static_files::respond(&request, &self.config)
                .await
                .with_header("Connection", if keep_alive { "keep-alive" } else { "close" });

            let status = response.status;
            match response.write_to(stream, request.version, self.config.idle_timeout).await {
                Ok(sent) => log_access(peer, &request, status.as_u16(), sent),
                Err(WriteError::Peer(e)) => {
                    debug!("{peer}: response aborted: {e}");
                    return Ok(());
                }
                Err(WriteError::Body(e)) => return Err(Error::IoError(e)),
            }

            if !keep_alive {
                return Ok(());
            }
        }
    }

    async fn reject<S>(&self, stream: &mut S, peer: SocketAddr, error: ParserError, version: Option<HttpVersion>)
    where
        S: AsyncWrite + Unpin,
    {
        let Some(status) = parse_error_status(&error) else {
            debug!("{peer}: {error}");
            return;
        };

        info!("{peer} \"-\" {} ({error})", status.as_u16());
        let response = static_files::error_response(status, &self.config).with_header("Connection", "close");
        // Without a parsed request line, answer with the highest version spoken.
        let version = version.unwrap_or(HttpVersion::Http11);
        if let Err(e) = response.write_to(stream, version, self.config.idle_timeout).await {
            debug!("{peer}: error response aborted: {e}");
        }
    }
}

fn log_access(peer: SocketAddr, request: &HttpRequest, status: u16, sent: u64) {
    info!(
        "{peer} \"{} {} {}\" {status} {sent}",
        request.method, request.path, request.version
    );
}

impl From<ServerConfig> for ConnectionHandler {
    fn from(config: ServerConfig) -> Self {
        Self::new(Arc::new(config))
    }
}
