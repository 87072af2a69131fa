//! Server configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::parser::ParserLimits;
use crate::server::error::Error;

/// HTTP server configuration.
///
/// Every field has a default, so a JSON config file only needs to name the
/// settings it changes. `idle_timeout` is given in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host name or IP address to bind to.
    pub bind_host: String,
    /// TCP port to bind to; 0 picks a free port.
    pub bind_port: u16,
    /// Directory files are served from. Canonicalized by [`ServerConfig::validate`].
    pub document_root: PathBuf,
    /// Number of worker tasks handling connections.
    pub worker_count: usize,
    /// Listen backlog and capacity of the accepted-connection queue.
    pub backlog: usize,
    /// Largest accepted request header section.
    pub max_header_bytes: usize,
    /// Longest accepted request line.
    pub max_request_line_bytes: usize,
    /// Most header lines accepted in one request.
    pub max_header_count: usize,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Per read/write timeout on client sockets.
    #[serde(deserialize_with = "seconds")]
    pub idle_timeout: Duration,
    /// Requests served on one connection before it is closed.
    pub max_requests_per_connection: usize,
    /// File served when a directory is requested.
    pub default_document: String,
    /// Files up to this size are read into memory; larger ones are streamed.
    pub in_memory_file_limit: u64,
    /// Value of the `Server` response header.
    pub server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = ParserLimits::default();
        Self {
            bind_host: "127.0.0.1".to_string(),
            bind_port: 8080,
            document_root: PathBuf::from("/www/data"),
            worker_count: 5,
            backlog: 128,
            max_header_bytes: limits.max_header_bytes,
            max_request_line_bytes: limits.max_request_line_bytes,
            max_header_count: limits.max_header_count,
            max_body_bytes: limits.max_body_bytes,
            idle_timeout: limits.idle_timeout,
            max_requests_per_connection: 100,
            default_document: "index.html".to_string(),
            in_memory_file_limit: 64 * 1024,
            server_name: concat!("microstatic-rs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ServerConfig {
    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Check the settings and canonicalize the document root.
    ///
    /// This is the only place the document root is resolved against the
    /// filesystem; requests only join and normalize below it.
    pub fn validate(mut self) -> Result<Self, Error> {
        if self.worker_count == 0 {
            return Err(Error::InvalidConfig("worker_count must be positive".to_string()));
        }
        if self.backlog == 0 {
            return Err(Error::InvalidConfig("backlog must be positive".to_string()));
        }
        if self.max_requests_per_connection == 0 {
            return Err(Error::InvalidConfig(
                "max_requests_per_connection must be positive".to_string(),
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(Error::InvalidConfig("idle_timeout must be positive".to_string()));
        }
        if self.default_document.is_empty() || self.default_document.contains('/') {
            return Err(Error::InvalidConfig(format!(
                "default_document must be a plain file name, got {:?}",
                self.default_document
            )));
        }

        let root = fs::canonicalize(&self.document_root)
            .map_err(|e| Error::InvalidDocumentRoot {
                path: self.document_root.clone(),
                reason: e.to_string(),
            })?;
        if !root.is_dir() {
            return Err(Error::InvalidDocumentRoot {
                path: root,
                reason: "not a directory".to_string(),
            });
        }
        self.document_root = root;

        Ok(self)
    }

    /// `host:port` as configured.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    /// Limits handed to the request parser.
    pub fn parser_limits(&self) -> ParserLimits {
        ParserLimits {
            max_request_line_bytes: self.max_request_line_bytes,
            max_header_bytes: self.max_header_bytes,
            max_header_count: self.max_header_count,
            max_body_bytes: self.max_body_bytes,
            idle_timeout: self.idle_timeout,
        }
    }
}

fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
