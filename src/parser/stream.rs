//! Reading requests off an async byte stream.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::parser::error::Error;
use crate::parser::machine::{ParserLimits, RequestParser};
use crate::parser::request::HttpRequest;

const READ_CHUNK: usize = 8 * 1024;

/// Read one request from `reader`.
///
/// `buf` carries bytes between calls: anything the client sent after the end
/// of this request stays in it for the next call on the same connection.
/// Every individual read is bounded by `limits.idle_timeout`.
pub async fn read_request<R>(reader: &mut R, buf: &mut Vec<u8>, limits: &ParserLimits) -> Result<HttpRequest, Error>
where
    R: AsyncRead + Unpin,
{
    read_request_with(&mut RequestParser::new(*limits), reader, buf).await
}

/// Like [`read_request`], driving a caller-owned parser.
///
/// After an error the parser still reports the request version, if the
/// request line got that far.
pub async fn read_request_with<R>(parser: &mut RequestParser, reader: &mut R, buf: &mut Vec<u8>) -> Result<HttpRequest, Error>
where
    R: AsyncRead + Unpin,
{
    let idle_timeout = parser.limits().idle_timeout;
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        if let Some(request) = parser.advance(buf)? {
            return Ok(request);
        }

        let n = match timeout(idle_timeout, reader.read(&mut chunk)).await {
            Ok(read) => read?,
            Err(_) if parser.in_body() => {
                return Err(Error::bad_request("Request body shorter than Content-Length"));
            }
            Err(_) => return Err(Error::Timeout),
        };

        if n == 0 {
            if parser.at_start() && buf.is_empty() {
                return Err(Error::ConnectionClosed);
            }
            return Err(Error::bad_request("Connection closed in the middle of a request"));
        }

        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Parse a complete HTTP request from a byte slice using default limits.
///
/// # Arguments
///
/// * `input` - A byte slice containing the HTTP request to parse
///
/// # Returns
///
/// The parsed HTTP request, or an error if the request is invalid or incomplete
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    parse_request_with_limits(input, &ParserLimits::default())
}

/// Parse a complete HTTP request from a byte slice.
pub fn parse_request_with_limits(input: &[u8], limits: &ParserLimits) -> Result<HttpRequest, Error> {
    if input.is_empty() {
        return Err(Error::bad_request("Empty request"));
    }

    let mut buf = input.to_vec();
    RequestParser::new(*limits)
        .advance(&mut buf)?
        .ok_or_else(|| Error::bad_request("Incomplete request"))
}
