//! HTTP response types and serialization.

use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::parser::{Headers, HttpVersion};
use crate::server::error::WriteError;

/// HTTP status codes this server produces, with their reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    UriTooLong = 414,
    RequestHeaderFieldsTooLarge = 431,
    InternalServerError = 500,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::UriTooLong => "URI Too Long",
            StatusCode::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Where the response body comes from.
#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// An open file streamed to the client; exactly `len` bytes are sent.
    File { file: File, len: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Body::Empty => 0,
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Represents an HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The HTTP headers, serialized in insertion order
    pub headers: Headers,
    /// The response body
    pub body: Body,
}

impl HttpResponse {
    /// Create a new HTTP response with the given status code and no body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    /// Give the response a short `text/plain` body naming its status, as sent for errors.
    pub fn with_error_body(self) -> Self {
        let text = format!("{} {}\n", self.status.as_u16(), self.status.reason_phrase());
        self.with_content_type("text/plain; charset=utf-8").with_body_string(text)
    }

    /// Set the response body with a string.
    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        self.with_body_bytes(body.into().into_bytes())
    }

    /// Set the response body with bytes.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Body::Bytes(body.into());
        let content_length = self.body.len().to_string();
        self.with_header("Content-Length", content_length)
    }

    /// Stream `len` bytes of an open file as the body.
    pub fn with_body_file(mut self, file: File, len: u64) -> Self {
        self.body = Body::File { file, len };
        self.with_header("Content-Length", len.to_string())
    }

    /// Drop the body but keep every header, `Content-Length` included.
    ///
    /// This is how a HEAD response is derived from the GET one.
    pub fn without_body(mut self) -> Self {
        self.body = Body::Empty;
        self
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Status line and header section.
    pub fn head_bytes(&self, version: HttpVersion) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(256);

        let status_line = format!("{version} {} {}\r\n", self.status.as_u16(), self.status.reason_phrase());
        bytes.extend_from_slice(status_line.as_bytes());

        for (name, value) in self.headers.iter() {
            let header_line = format!("{name}: {value}\r\n");
            bytes.extend_from_slice(header_line.as_bytes());
        }

        // Add the empty line that separates headers from body
        bytes.extend_from_slice(b"\r\n");
        bytes
    }

    /// Convert an in-memory response to bytes. File bodies are not included.
    pub fn to_bytes(&self, version: HttpVersion) -> Vec<u8> {
        let mut bytes = self.head_bytes(version);
        if let Body::Bytes(body) = &self.body {
            bytes.extend_from_slice(body);
        }
        bytes
    }

    /// Write the whole response, streaming a file body in chunks.
    ///
    /// Every single write is bounded by `write_timeout`, so a slow but
    /// steadily reading client is not cut off. Returns the number of body
    /// bytes sent. A file that turns out shorter than announced is a
    /// [`WriteError::Body`], since the framing is already broken and the
    /// connection has to be dropped.
    pub async fn write_to<W>(self, writer: &mut W, version: HttpVersion, write_timeout: Duration) -> Result<u64, WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut head = self.head_bytes(version);
        match self.body {
            Body::Empty => {
                send(writer, &head, write_timeout).await?;
                Ok(0)
            }
            Body::Bytes(body) => {
                head.extend_from_slice(&body);
                send(writer, &head, write_timeout).await?;
                Ok(body.len() as u64)
            }
            Body::File { mut file, len } => {
                send(writer, &head, write_timeout).await?;

                let mut chunk = vec![0u8; FILE_CHUNK.min(len as usize).max(1)];
                let mut sent = 0u64;
                while sent < len {
                    let want = chunk.len().min((len - sent) as usize);
                    let n = file.read(&mut chunk[..want]).await.map_err(WriteError::Body)?;
                    if n == 0 {
                        return Err(WriteError::Body(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            format!("file ended after {sent} of {len} bytes"),
                        )));
                    }
                    send(writer, &chunk[..n], write_timeout).await?;
                    sent += n as u64;
                }
                Ok(sent)
            }
        }
    }
}

const FILE_CHUNK: usize = 64 * 1024;

async fn send<W>(writer: &mut W, bytes: &[u8], write_timeout: Duration) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    let write = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    };
    match timeout(write_timeout, write).await {
        Ok(result) => result.map_err(WriteError::Peer),
        Err(_) => Err(WriteError::Peer(std::io::ErrorKind::TimedOut.into())),
    }
}
