//! Incremental request parser.
//!
//! The parser is a finite-state machine driven over a byte buffer:
//!
//! ```text
//! StartLine --> Headers --> Body --> Done
//!                  \__________________/
//!                  (no Content-Length)
//! ```
//!
//! Each state has its own transition function. A transition either moves to
//! the next state, parks the parser in its current state until more bytes
//! arrive, or yields a finished [`HttpRequest`]. Consumed bytes are drained
//! from the front of the buffer, so anything left over after a request
//! belongs to the next one on the same connection.

use std::time::Duration;

use crate::parser::error::Error;
use crate::parser::headers::Headers;
use crate::parser::method::{is_token_char, Method};
use crate::parser::request::HttpRequest;
use crate::parser::version::HttpVersion;

/// Size and time limits applied while reading a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    /// Longest accepted request line, excluding the CRLF.
    pub max_request_line_bytes: usize,
    /// Largest accepted header section, including line terminators.
    pub max_header_bytes: usize,
    /// Most header lines accepted in one request.
    pub max_header_count: usize,
    /// Largest accepted `Content-Length`.
    pub max_body_bytes: usize,
    /// Longest a single read may stall before the request is abandoned.
    pub idle_timeout: Duration,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_request_line_bytes: 8 * 1024,
            max_header_bytes: 16 * 1024,
            max_header_count: 100,
            max_body_bytes: 1024 * 1024,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Request line and headers collected so far.
#[derive(Debug)]
struct Head {
    method: Method,
    target: String,
    version: HttpVersion,
    headers: Headers,
    header_bytes: usize,
    header_lines: usize,
}

#[derive(Debug)]
enum State {
    StartLine,
    Headers(Head),
    Body { head: Head, length: usize },
    Done,
}

/// Outcome of a single transition.
enum Step {
    /// Move on to another state immediately.
    Next(State),
    /// Stay in this state until more bytes are buffered.
    Wait(State),
    Complete(HttpRequest),
}

/// Incremental HTTP/1.x request parser.
#[derive(Debug)]
pub struct RequestParser {
    state: State,
    limits: ParserLimits,
    version: Option<HttpVersion>,
}

impl RequestParser {
    pub fn new(limits: ParserLimits) -> Self {
        Self {
            state: State::StartLine,
            limits,
            version: None,
        }
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    /// Version of the request being parsed, once its request line is in.
    ///
    /// Still set after a later error, so a rejection can answer in the
    /// client's version.
    pub fn version(&self) -> Option<HttpVersion> {
        self.version
    }

    /// Feed the buffered bytes through the state machine.
    ///
    /// Returns `Ok(None)` when more input is needed. On success the bytes
    /// making up the request have been drained from `buf`. A parser in the
    /// `Done` state starts over with the next request.
    pub fn advance(&mut self, buf: &mut Vec<u8>) -> Result<Option<HttpRequest>, Error> {
        loop {
            let step = match std::mem::replace(&mut self.state, State::Done) {
                State::StartLine => self.on_start_line(buf)?,
                State::Headers(head) => self.on_headers(head, buf)?,
                State::Body { head, length } => on_body(head, length, buf),
                State::Done => Step::Next(State::StartLine),
            };

            match step {
                Step::Next(next) => self.state = next,
                Step::Wait(current) => {
                    self.state = current;
                    return Ok(None);
                }
                Step::Complete(request) => return Ok(Some(request)),
            }
        }
    }

    /// True until the request line has been consumed.
    pub fn at_start(&self) -> bool {
        matches!(self.state, State::StartLine | State::Done)
    }

    /// True while waiting for declared body bytes.
    pub fn in_body(&self) -> bool {
        matches!(self.state, State::Body { .. })
    }

    fn on_start_line(&mut self, buf: &mut Vec<u8>) -> Result<Step, Error> {
        self.version = None;

        // Tolerate stray empty lines between requests on a kept-alive connection.
        while buf.starts_with(b"\r\n") {
            buf.drain(..2);
        }

        let max = self.limits.max_request_line_bytes;
        let Some(line_end) = find_line(buf)? else {
            if buf.len() > max + 1 {
                return Err(Error::UriTooLong);
            }
            return Ok(Step::Wait(State::StartLine));
        };
        if line_end > max {
            return Err(Error::UriTooLong);
        }

        let line = std::str::from_utf8(&buf[..line_end])
            .map_err(|_| Error::bad_request("Request line is not valid UTF-8"))?;
        let head = parse_request_line(line)?;
        self.version = Some(head.version);
        buf.drain(..line_end + 2);

        Ok(Step::Next(State::Headers(head)))
    }

    fn on_headers(&self, mut head: Head, buf: &mut Vec<u8>) -> Result<Step, Error> {
        let budget = self.limits.max_header_bytes;
        loop {
            let Some(line_end) = find_line(buf)? else {
                if head.header_bytes + buf.len() > budget {
                    return Err(Error::HeaderTooLarge);
                }
                return Ok(Step::Wait(State::Headers(head)));
            };

            head.header_bytes += line_end + 2;
            if head.header_bytes > budget {
                return Err(Error::HeaderTooLarge);
            }

            if line_end == 0 {
                buf.drain(..2);
                return self.finish_head(head);
            }

            head.header_lines += 1;
            if head.header_lines > self.limits.max_header_count {
                return Err(Error::HeaderTooLarge);
            }

            let (name, value) = parse_header_line(&buf[..line_end])?;
            head.headers.insert(name, value);
            buf.drain(..line_end + 2);
        }
    }

    fn finish_head(&self, head: Head) -> Result<Step, Error> {
        if head.version == HttpVersion::Http11 && !head.headers.contains("Host") {
            return Err(Error::bad_request("Missing Host header"));
        }
        if head.headers.contains("Transfer-Encoding") {
            return Err(Error::bad_request("Transfer-Encoding is not supported"));
        }

        let length = match head.headers.get("Content-Length") {
            Some(value) => parse_content_length(value)?,
            None => 0,
        };
        if length > self.limits.max_body_bytes {
            return Err(Error::bad_request(format!(
                "Request body of {length} bytes exceeds the limit of {}",
                self.limits.max_body_bytes
            )));
        }

        if length == 0 {
            Ok(Step::Complete(head.into_request(Vec::new())))
        } else {
            Ok(Step::Next(State::Body { head, length }))
        }
    }
}

fn on_body(head: Head, length: usize, buf: &mut Vec<u8>) -> Step {
    if buf.len() < length {
        return Step::Wait(State::Body { head, length });
    }
    let body: Vec<u8> = buf.drain(..length).collect();
    Step::Complete(head.into_request(body))
}

impl Head {
    fn into_request(self, body: Vec<u8>) -> HttpRequest {
        HttpRequest::with_body(self.method, &self.target, self.version, self.headers, body)
    }
}

/// Length of the first line in `buf`, excluding its CRLF.
///
/// A line feed not preceded by a carriage return is rejected.
fn find_line(buf: &[u8]) -> Result<Option<usize>, Error> {
    match buf.iter().position(|&b| b == b'\n') {
        Some(0) => Err(Error::bad_request("Line not terminated by CRLF")),
        Some(lf) if buf[lf - 1] != b'\r' => Err(Error::bad_request("Line not terminated by CRLF")),
        Some(lf) => Ok(Some(lf - 1)),
        None => Ok(None),
    }
}

fn parse_request_line(line: &str) -> Result<Head, Error> {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() != 3 || parts.iter().any(|part| part.is_empty()) {
        return Err(Error::bad_request(format!("Malformed request line: {line}")));
    }

    let method = parts[0].parse::<Method>()?;
    let target = parts[1];
    if !target.starts_with('/') {
        return Err(Error::bad_request(format!("Invalid request target: {target}")));
    }
    let version = parts[2].parse::<HttpVersion>()?;

    Ok(Head {
        method,
        target: target.to_string(),
        version,
        headers: Headers::new(),
        header_bytes: 0,
        header_lines: 0,
    })
}

fn parse_header_line(line: &[u8]) -> Result<(String, String), Error> {
    if matches!(line.first(), Some(b' ' | b'\t')) {
        return Err(Error::bad_request("Obsolete header line folding"));
    }

    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| Error::bad_request("Header line without colon"))?;
    let (name, value) = (&line[..colon], &line[colon + 1..]);

    if name.is_empty() || !name.iter().all(|&b| is_token_char(b)) {
        return Err(Error::bad_request("Invalid header name"));
    }
    if value.iter().any(|&b| b == 0 || b == b'\r') {
        return Err(Error::bad_request("Invalid header value"));
    }

    // Field values are opaque octets; ISO-8859-1 maps each one to a char.
    let name: String = name.iter().map(|&b| b as char).collect();
    let value: String = value.iter().map(|&b| b as char).collect();
    Ok((name, value.trim_matches([' ', '\t']).to_string()))
}

fn parse_content_length(value: &str) -> Result<usize, Error> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::bad_request(format!("Invalid Content-Length: {value}")));
    }
    value
        .parse::<usize>()
        .map_err(|_| Error::bad_request(format!("Invalid Content-Length: {value}")))
}
