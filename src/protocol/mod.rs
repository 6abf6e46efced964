//! Text Protocol Implementation
//!
//! This module implements the line-oriented GET/SET dialect spoken by
//! tinycache. Every request is one CRLF-terminated line and every connection
//! carries exactly one request.
//!
//! ## Modules
//!
//! - `types`: `Request`, `Response` and the wire constants
//! - `parser`: Zero-copy parser and the `ParseError` taxonomy
//!
//! ## Example
//!
//! ```
//! use tinycache::protocol::{parse_request, ParseError, Request, Response};
//!
//! let request = parse_request(b"GET foo\r\n").unwrap();
//! assert_eq!(request, Request::get("foo"));
//!
//! let err = parse_request(b"SET baz\r\n").unwrap_err();
//! assert_eq!(err, ParseError::NoValue);
//! assert_eq!(Response::from(err).serialize(), b"CLIENT_ERROR no value\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_request, ParseError, ParseResult, RequestParser, DEFAULT_MAX_REQUEST_SIZE};
pub use types::{Request, Response};
