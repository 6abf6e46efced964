//! Request Parser
//!
//! Converts the bytes captured from a single read of a connection into a
//! [`Request`], or into one of the five protocol errors.
//!
//! ## How the Parser Works
//!
//! Parsing is a single pass with no backtracking:
//!
//! 1. The buffer must end with CRLF, otherwise it is a malformed request.
//! 2. The terminator is stripped and the line is split on the first space
//!    into a command token and a remainder.
//! 3. The command token is matched exactly (case-sensitive):
//!    - `GET`: the remainder is the key.
//!    - `SET`: the remainder is split again on the first space into the key
//!      and the value. The value keeps any further spaces.
//!    - anything else is an unknown command.
//!
//! The `Display` text of every [`ParseError`] is part of the wire contract:
//! it is sent verbatim after `CLIENT_ERROR `.

use crate::protocol::types::{Request, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer does not end with CRLF
    #[error("malformed request")]
    MalformedRequest,

    /// `GET` without a key, or `SET` with a value but no key
    #[error("no key")]
    NoKey,

    /// `SET <key>` without a value
    #[error("no value")]
    NoValue,

    /// `SET` with nothing after it
    #[error("no key nor value")]
    NoKeyNorValue,

    /// The command token is neither `GET` nor `SET`
    #[error("unknown command")]
    UnknownCommand,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum number of bytes read for a single request.
///
/// A longer message is truncated by the connection handler, which in
/// practice drops its terminator and makes it a malformed request.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024;

const GET: &[u8] = b"GET";
const SET: &[u8] = b"SET";
const SPACE: u8 = b' ';

/// A zero-copy request parser.
///
/// The key and value of the returned request share the input buffer.
///
/// # Example
///
/// ```
/// use tinycache::protocol::{Request, RequestParser};
/// use bytes::Bytes;
///
/// let request = RequestParser::parse(Bytes::from_static(b"SET bar bar value\r\n")).unwrap();
/// assert_eq!(request, Request::set("bar", "bar value"));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestParser;

impl RequestParser {
    /// Parses a complete request from the buffer.
    pub fn parse(buf: Bytes) -> ParseResult<Request> {
        if !buf.ends_with(CRLF) {
            return Err(ParseError::MalformedRequest);
        }

        let line = buf.slice(..buf.len() - CRLF.len());

        let (command, remainder) = split_once(&line);

        match &command[..] {
            GET => Self::parse_get(remainder),
            SET => Self::parse_set(remainder),
            _ => Err(ParseError::UnknownCommand),
        }
    }

    /// `GET <key>`
    fn parse_get(remainder: Option<Bytes>) -> ParseResult<Request> {
        match remainder {
            Some(key) if !key.is_empty() => Ok(Request::Get { key }),
            _ => Err(ParseError::NoKey),
        }
    }

    /// `SET <key> <value...>`
    fn parse_set(remainder: Option<Bytes>) -> ParseResult<Request> {
        let remainder = match remainder {
            Some(r) if !r.is_empty() => r,
            _ => return Err(ParseError::NoKeyNorValue),
        };

        let (key, value) = split_once(&remainder);
        let value = value.unwrap_or_default();

        match (key.is_empty(), value.is_empty()) {
            (true, true) => Err(ParseError::NoKeyNorValue),
            (true, false) => Err(ParseError::NoKey),
            (false, true) => Err(ParseError::NoValue),
            (false, false) => Ok(Request::Set { key, value }),
        }
    }
}

/// Splits on the first space. The second half is `None` when there is no space.
fn split_once(buf: &Bytes) -> (Bytes, Option<Bytes>) {
    match buf.iter().position(|&b| b == SPACE) {
        Some(pos) => (buf.slice(..pos), Some(buf.slice(pos + 1..))),
        None => (buf.clone(), None),
    }
}

/// Parses a request from a byte slice.
///
/// This is a convenience function for callers that do not hold a `Bytes`.
pub fn parse_request(buf: &[u8]) -> ParseResult<Request> {
    RequestParser::parse(Bytes::copy_from_slice(buf))
}
