//! # chunkwire
//!
//! An **incremental HTTP/1.1 response parser** for chunked responses,
//! implemented as two cooperating state machines, plus a minimal blocking
//! client and a CLI tool.
//!
//! The parser accepts the response in fragments of any size, exactly as a
//! socket delivers them, and produces the same result however the bytes are
//! split. The body must use `Transfer-Encoding: chunked`.
//!
//! ## Quick start: one-shot parsing
//!
//! ```rust
//! use chunkwire::parse_response;
//!
//! let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
//!             4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
//! let response = parse_response(raw).expect("valid response");
//! assert_eq!(response.status_code, "200");
//! assert_eq!(response.status_text, "OK");
//! assert_eq!(response.body_as_str(), Some("Wikipedia"));
//! ```
//!
//! ## Quick start: incremental parsing
//!
//! ```rust
//! use chunkwire::{ParseStatus, ResponseParser};
//!
//! let mut parser = ResponseParser::new();
//!
//! let status = parser.feed(b"HTTP/1.1 200 OK\r\n").unwrap();
//! assert_eq!(status, ParseStatus::Incomplete);
//!
//! let status = parser.feed(b"Foo: bar\r\n\r\n0\r\n\r\n").unwrap();
//! assert!(matches!(status, ParseStatus::Complete(_)));
//!
//! let response = parser.finish().unwrap();
//! assert_eq!(response.headers.get("Foo"), Some("bar"));
//! ```

mod chunked;
pub mod client;
mod error;
mod output;
mod parser;
pub mod request;
mod types;

// Re-export public API.
pub use chunked::ChunkedBodyParser;
pub use client::{ClientConfig, send, send_on, send_with_config};
pub use error::{ClientError, ParseError};
pub use output::{format_debug, format_headers_only, format_json};
pub use parser::{HeaderWhitespace, ParseStatus, ParserConfig, ResponseParser};
pub use request::{HttpRequest, RequestBody};
pub use types::{Header, HeaderMap, HttpResponse, StatusLine};

/// Parse a **complete** HTTP response from a byte slice in one call.
///
/// This is a convenience wrapper around [`ResponseParser`]. For incremental
/// use-cases, create a `ResponseParser` directly.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed or incomplete.
pub fn parse_response(data: &[u8]) -> Result<HttpResponse, ParseError> {
    parse_response_with_config(data, ParserConfig::default())
}

/// Parse a **complete** HTTP response using custom [`ParserConfig`] limits.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed, incomplete, or
/// exceeds the configured limits.
pub fn parse_response_with_config(
    data: &[u8],
    config: ParserConfig,
) -> Result<HttpResponse, ParseError> {
    let mut parser = ResponseParser::with_config(config);
    match parser.feed(data)? {
        ParseStatus::Complete(_) => parser.finish(),
        ParseStatus::Incomplete => Err(ParseError::UnexpectedEndOfStream),
    }
}
