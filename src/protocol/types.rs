//! Request and Response Types
//!
//! This module defines the values that travel through the text protocol.
//! A request is a single CRLF-terminated line; a response is one or more
//! CRLF-terminated lines.
//!
//! ## Wire Format
//!
//! | Request                    | Response                               |
//! |----------------------------|----------------------------------------|
//! | `GET <key>\r\n`            | `<value>\r\nENDS\r\n` or `ENDS\r\n`    |
//! | `SET <key> <value...>\r\n` | `STORED\r\n`                           |
//! | anything invalid           | `CLIENT_ERROR <message>\r\n`           |

use crate::protocol::parser::ParseError;
use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used by every request and response line.
pub const CRLF: &[u8] = b"\r\n";

/// Terminates the result set of a GET.
pub const ENDS: &[u8] = b"ENDS";

/// Acknowledges a SET.
pub const STORED: &[u8] = b"STORED";

/// Prefix of every protocol-level error line.
pub const CLIENT_ERROR: &[u8] = b"CLIENT_ERROR";

/// A parsed request.
///
/// Keys and values are slices of the buffer the request was read into, so
/// building a `Request` never copies the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `GET <key>`
    Get { key: Bytes },

    /// `SET <key> <value...>`
    ///
    /// The value is everything after the key up to the terminator and may
    /// contain spaces.
    Set { key: Bytes, value: Bytes },
}

impl Request {
    /// Creates a GET request.
    pub fn get(key: impl Into<Bytes>) -> Self {
        Request::Get { key: key.into() }
    }

    /// Creates a SET request.
    pub fn set(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Request::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the command name, as it appears on the wire.
    pub fn command_name(&self) -> &'static str {
        match self {
            Request::Get { .. } => "GET",
            Request::Set { .. } => "SET",
        }
    }

    /// Returns the key this request addresses.
    pub fn key(&self) -> &Bytes {
        match self {
            Request::Get { key } | Request::Set { key, .. } => key,
        }
    }
}

/// A response ready to be written back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Result of a GET. `None` means the key was not found, which is an
    /// empty result set rather than an error.
    Value(Option<Bytes>),

    /// Result of a SET.
    Stored,

    /// The request could not be parsed.
    ClientError(ParseError),
}

impl Response {
    /// Serializes the response to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Value(value) => {
                if let Some(value) = value {
                    buf.extend_from_slice(value);
                    buf.extend_from_slice(CRLF);
                }
                buf.extend_from_slice(ENDS);
                buf.extend_from_slice(CRLF);
            }
            Response::Stored => {
                buf.extend_from_slice(STORED);
                buf.extend_from_slice(CRLF);
            }
            Response::ClientError(err) => {
                buf.extend_from_slice(CLIENT_ERROR);
                buf.push(b' ');
                buf.extend_from_slice(err.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// Returns true if this is a `CLIENT_ERROR` response.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Response::ClientError(_))
    }

    fn encoded_len(&self) -> usize {
        match self {
            Response::Value(Some(value)) => value.len() + ENDS.len() + 2 * CRLF.len(),
            Response::Value(None) => ENDS.len() + CRLF.len(),
            Response::Stored => STORED.len() + CRLF.len(),
            Response::ClientError(_) => 64,
        }
    }
}

impl From<ParseError> for Response {
    fn from(err: ParseError) -> Self {
        Response::ClientError(err)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Value(Some(data)) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            Response::Value(None) => write!(f, "(not found)"),
            Response::Stored => write!(f, "STORED"),
            Response::ClientError(err) => write!(f, "(client error) {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_value_serialize() {
        let response = Response::Value(Some(Bytes::from("foo value")));
        assert_eq!(response.serialize(), b"foo value\r\nENDS\r\n");
    }

    #[test]
    fn test_missing_value_serialize() {
        assert_eq!(Response::Value(None).serialize(), b"ENDS\r\n");
    }

    #[test]
    fn test_empty_value_still_has_its_own_line() {
        let response = Response::Value(Some(Bytes::new()));
        assert_eq!(response.serialize(), b"\r\nENDS\r\n");
    }

    #[test]
    fn test_stored_serialize() {
        assert_eq!(Response::Stored.serialize(), b"STORED\r\n");
    }

    #[test]
    fn test_client_error_serialize() {
        let cases: [(ParseError, &[u8]); 5] = [
            (
                ParseError::MalformedRequest,
                b"CLIENT_ERROR malformed request\r\n",
            ),
            (ParseError::NoKey, b"CLIENT_ERROR no key\r\n"),
            (ParseError::NoValue, b"CLIENT_ERROR no value\r\n"),
            (ParseError::NoKeyNorValue, b"CLIENT_ERROR no key nor value\r\n"),
            (ParseError::UnknownCommand, b"CLIENT_ERROR unknown command\r\n"),
        ];

        for (err, expected) in cases {
            assert_eq!(Response::from(err).serialize(), expected);
        }
    }

    #[test]
    fn test_serialize_into_appends() {
        let mut buf = b"prefix:".to_vec();
        Response::Stored.serialize_into(&mut buf);
        assert_eq!(buf, b"prefix:STORED\r\n");
    }

    #[test]
    fn test_is_client_error() {
        assert!(Response::from(ParseError::NoKey).is_client_error());
        assert!(!Response::Stored.is_client_error());
        assert!(!Response::Value(None).is_client_error());
    }

    #[test]
    fn test_response_display() {
        assert_eq!(
            Response::Value(Some(Bytes::from("foo value"))).to_string(),
            "\"foo value\""
        );
        assert_eq!(
            Response::Value(Some(Bytes::from_static(b"\xff\x00"))).to_string(),
            "(binary data, 2 bytes)"
        );
        assert_eq!(Response::Value(None).to_string(), "(not found)");
        assert_eq!(Response::Stored.to_string(), "STORED");
        assert_eq!(
            Response::from(ParseError::NoValue).to_string(),
            "(client error) no value"
        );
    }

    #[test]
    fn test_request_accessors() {
        let get = Request::get("foo");
        assert_eq!(get.command_name(), "GET");
        assert_eq!(get.key(), &Bytes::from("foo"));

        let set = Request::set("bar", "bar value");
        assert_eq!(set.command_name(), "SET");
        assert_eq!(set.key(), &Bytes::from("bar"));
    }
}
