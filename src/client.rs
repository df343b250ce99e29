//! A minimal blocking client.
//!
//! The request is written in one go, then every socket read is fed to a
//! [`ResponseParser`] until the chunked body is complete.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{ClientError, ParseError};
use crate::parser::{ParseStatus, ParserConfig, ResponseParser};
use crate::request::HttpRequest;
use crate::types::HttpResponse;

/// Settings for [`send_with_config`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Socket read timeout; `None` blocks until the peer sends or closes.
    pub read_timeout: Option<Duration>,
    /// Size of the buffer handed to each `read` call (default: 4 096).
    pub read_buffer_size: usize,
    /// Limits for the response parser.
    pub parser: ParserConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: None,
            read_buffer_size: 4_096,
            parser: ParserConfig::default(),
        }
    }
}

/// Send `request` over a new TCP connection with default settings.
///
/// # Errors
///
/// See [`send_with_config`].
pub fn send(request: &HttpRequest) -> Result<HttpResponse, ClientError> {
    send_with_config(request, &ClientConfig::default())
}

/// Connect to `request.host:request.port`, send the request and read the
/// response.
///
/// # Errors
///
/// Returns [`ClientError::Io`] if connecting, writing or reading fails
/// (including a read timeout) and [`ClientError::Parse`] if the response is
/// malformed or the peer closes the connection before it is complete.
pub fn send_with_config(
    request: &HttpRequest,
    config: &ClientConfig,
) -> Result<HttpResponse, ClientError> {
    let mut stream = TcpStream::connect(request.authority())?;
    stream.set_read_timeout(config.read_timeout)?;
    send_on(&mut stream, request, config)
}

/// Send `request` on an already open stream and read the response from it.
///
/// # Errors
///
/// Same as [`send_with_config`], minus connection setup.
pub fn send_on<S: Read + Write>(
    stream: &mut S,
    request: &HttpRequest,
    config: &ClientConfig,
) -> Result<HttpResponse, ClientError> {
    let bytes = request.to_bytes()?;
    tracing::debug!(
        method = %request.method,
        path = %request.path,
        authority = %request.authority(),
        len = bytes.len(),
        "sending request"
    );
    stream.write_all(&bytes)?;
    stream.flush()?;

    let mut parser = ResponseParser::with_config(config.parser.clone());
    let mut buf = vec![0u8; config.read_buffer_size.max(1)];

    loop {
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        if n == 0 {
            tracing::warn!(
                received = parser.bytes_consumed(),
                "connection closed before the response was complete"
            );
            return Err(ParseError::UnexpectedEndOfStream.into());
        }

        tracing::trace!(n, "received");
        let status = parser
            .feed(&buf[..n])
            .inspect_err(|err| tracing::warn!(error = %err, "malformed response"))?;

        if let ParseStatus::Complete(consumed) = status {
            tracing::debug!(consumed, "response complete");
            break;
        }
    }

    Ok(parser.finish()?)
}
