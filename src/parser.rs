use memchr::{memchr, memchr2};

use crate::chunked::ChunkedBodyParser;
use crate::error::ParseError;
use crate::types::{HeaderMap, HttpResponse, StatusLine};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How the whitespace between a header colon and its value is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderWhitespace {
    /// Exactly one SP must follow the colon. Anything else is a
    /// [`ParseError::MalformedHeaderLine`].
    #[default]
    Strict,
    /// Any run of SP / HTAB (including none) is skipped before the value.
    Lenient,
}

/// Configurable limits for the response parser.
///
/// All sizes are in bytes unless stated otherwise.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum length of the status line (default: 8 192).
    pub max_status_line_len: usize,
    /// Maximum length of a single header field name (default: 256).
    pub max_header_name_len: usize,
    /// Maximum length of a single header field value (default: 8 192).
    pub max_header_value_len: usize,
    /// Maximum number of distinct header fields (default: 128).
    pub max_headers_count: usize,
    /// Maximum decoded body size (default: 10 MiB).
    pub max_body_size: usize,
    /// Whitespace rule after the header colon (default: strict).
    pub header_whitespace: HeaderWhitespace,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_status_line_len: 8_192,
            max_header_name_len: 256,
            max_header_value_len: 8_192,
            max_headers_count: 128,
            max_body_size: 10 * 1024 * 1024,
            header_whitespace: HeaderWhitespace::Strict,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse status
// ---------------------------------------------------------------------------

/// Outcome of a [`ResponseParser::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The response is complete. The contained value is the **total**
    /// number of bytes consumed so far (across all `feed` calls). Bytes past
    /// this offset, such as the final CRLF or trailer fields, were not
    /// consumed.
    Complete(usize),
    /// More data is needed.
    Incomplete,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum State {
    // ---- Status line ----
    StatusLine,
    StatusLineEnd,

    // ---- Header section ----
    HeaderName,
    HeaderSpace,
    HeaderValue,
    HeaderLineEnd,
    /// CR of the empty line seen; the body decoder already exists.
    HeaderBlockEnd(ChunkedBodyParser),

    // ---- Chunked body ----
    Body(ChunkedBodyParser),
}

// ---------------------------------------------------------------------------
// ResponseParser
// ---------------------------------------------------------------------------

/// An incremental HTTP/1.1 response parser for chunked responses.
///
/// Input may be split at any byte; feeding a response in one call or in
/// many fragments gives the same result.
///
/// ```rust
/// use chunkwire::{ParseStatus, ResponseParser};
///
/// let mut parser = ResponseParser::new();
/// assert_eq!(
///     parser.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chun").unwrap(),
///     ParseStatus::Incomplete
/// );
/// parser.feed(b"ked\r\n\r\n2\r\nhi\r\n0\r\n\r\n").unwrap();
/// assert!(parser.is_finished());
///
/// let response = parser.finish().unwrap();
/// assert_eq!(response.status_code, "200");
/// assert_eq!(response.body_as_str(), Some("hi"));
/// ```
#[derive(Debug, Clone)]
pub struct ResponseParser {
    state: State,
    config: ParserConfig,
    bytes_consumed: usize,

    // Accumulation buffers
    status_buf: Vec<u8>,
    header_name_buf: Vec<u8>,
    header_value_buf: Vec<u8>,

    // Parsed components
    status_line: Option<StatusLine>,
    headers: HeaderMap,

    /// First error seen; every later `feed` reports it again.
    error: Option<ParseError>,
}

impl ResponseParser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create a new parser with custom limits.
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            state: State::StatusLine,
            config,
            bytes_consumed: 0,
            status_buf: Vec::with_capacity(32),
            header_name_buf: Vec::with_capacity(32),
            header_value_buf: Vec::with_capacity(128),
            status_line: None,
            headers: HeaderMap::new(),
            error: None,
        }
    }

    /// Reset the parser so it can be reused for another response.
    pub fn reset(&mut self) {
        self.state = State::StatusLine;
        self.bytes_consumed = 0;
        self.status_buf.clear();
        self.header_name_buf.clear();
        self.header_value_buf.clear();
        self.status_line = None;
        self.headers.clear();
        self.error = None;
    }

    /// Feed a fragment of the response.
    ///
    /// Returns [`ParseStatus::Complete`] once the terminating zero-size
    /// chunk has been read, or [`ParseStatus::Incomplete`] if more data is
    /// required. Data fed after completion is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] on any framing violation or limit breach. The
    /// parser stays failed: later calls return the same error.
    pub fn feed(&mut self, data: &[u8]) -> Result<ParseStatus, ParseError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        if let Err(err) = self.advance(data) {
            tracing::debug!(error = %err, offset = self.bytes_consumed, "response parse failed");
            self.error = Some(err.clone());
            return Err(err);
        }

        if self.is_finished() {
            Ok(ParseStatus::Complete(self.bytes_consumed))
        } else {
            Ok(ParseStatus::Incomplete)
        }
    }

    fn advance(&mut self, data: &[u8]) -> Result<(), ParseError> {
        let mut i = 0;

        while i < data.len() && !self.is_finished() {
            let rest = &data[i..];

            let used = match &mut self.state {
                // ----- Run scanning paths -----
                State::StatusLine => self.scan_status_line(rest)?,
                State::HeaderName => self.scan_header_name(rest)?,
                State::HeaderValue => self.scan_header_value(rest)?,
                State::Body(body) => body.receive(rest)?,

                // ----- Single-byte states -----
                State::StatusLineEnd => {
                    expect_lf(rest[0], "LF after status line CR")?;
                    self.state = State::HeaderName;
                    1
                }

                State::HeaderSpace => {
                    self.header_space(rest[0])?;
                    1
                }

                State::HeaderLineEnd => {
                    expect_lf(rest[0], "LF after header value CR")?;
                    self.state = State::HeaderName;
                    1
                }

                State::HeaderBlockEnd(_) => {
                    expect_lf(rest[0], "LF after end-of-headers CR")?;
                    self.state = match std::mem::replace(&mut self.state, State::StatusLine) {
                        State::HeaderBlockEnd(body) => State::Body(body),
                        other => other,
                    };
                    1
                }
            };

            i += used;
            self.bytes_consumed += used;
        }

        Ok(())
    }

    // ----- per-state scanners ---------------------------------------------

    fn scan_status_line(&mut self, rest: &[u8]) -> Result<usize, ParseError> {
        let end = memchr(b'\r', rest);
        let run = &rest[..end.unwrap_or(rest.len())];

        if self.status_buf.len() + run.len() > self.config.max_status_line_len {
            return Err(ParseError::StatusLineTooLarge);
        }
        self.status_buf.extend_from_slice(run);

        match end {
            Some(pos) => {
                self.status_line = Some(StatusLine::parse(&self.status_buf)?);
                self.state = State::StatusLineEnd;
                Ok(pos + 1)
            }
            None => Ok(rest.len()),
        }
    }

    fn scan_header_name(&mut self, rest: &[u8]) -> Result<usize, ParseError> {
        let end = memchr2(b':', b'\r', rest);
        let run = &rest[..end.unwrap_or(rest.len())];

        if let Some(&bad) = run.iter().find(|&&b| !is_tchar(b)) {
            return Err(ParseError::MalformedHeaderLine(format!(
                "invalid byte 0x{bad:02X} in header name"
            )));
        }
        if self.header_name_buf.len() + run.len() > self.config.max_header_name_len {
            return Err(ParseError::HeaderTooLarge);
        }
        self.header_name_buf.extend_from_slice(run);

        let Some(pos) = end else {
            return Ok(rest.len());
        };

        if rest[pos] == b':' {
            if self.header_name_buf.is_empty() {
                return Err(ParseError::MalformedHeaderLine("empty header name".into()));
            }
            self.state = State::HeaderSpace;
        } else if self.header_name_buf.is_empty() {
            // Empty line: end of the header block.
            tracing::trace!(headers = self.headers.len(), "header block complete");
            self.state = State::HeaderBlockEnd(ChunkedBodyParser::with_limit(
                self.config.max_body_size,
            ));
        } else {
            return Err(ParseError::MalformedHeaderLine(format!(
                "header '{}' has no ':'",
                String::from_utf8_lossy(&self.header_name_buf)
            )));
        }
        Ok(pos + 1)
    }

    fn header_space(&mut self, byte: u8) -> Result<(), ParseError> {
        match (self.config.header_whitespace, byte) {
            (HeaderWhitespace::Strict, b' ') => self.state = State::HeaderValue,
            (HeaderWhitespace::Strict, _) => {
                return Err(ParseError::MalformedHeaderLine(format!(
                    "expected a single space after '{}:'",
                    String::from_utf8_lossy(&self.header_name_buf)
                )));
            }
            (HeaderWhitespace::Lenient, b' ' | b'\t') => {}
            (HeaderWhitespace::Lenient, b'\r') => {
                self.commit_header()?;
                self.state = State::HeaderLineEnd;
            }
            (HeaderWhitespace::Lenient, _) => {
                self.state = State::HeaderValue;
                self.scan_header_value(&[byte])?;
            }
        }
        Ok(())
    }

    fn scan_header_value(&mut self, rest: &[u8]) -> Result<usize, ParseError> {
        let end = memchr(b'\r', rest);
        let run = &rest[..end.unwrap_or(rest.len())];

        if let Some(&bad) = run.iter().find(|&&b| !is_field_content_byte(b)) {
            return Err(ParseError::MalformedHeaderLine(format!(
                "invalid byte 0x{bad:02X} in value of '{}'",
                String::from_utf8_lossy(&self.header_name_buf)
            )));
        }
        if self.header_value_buf.len() + run.len() > self.config.max_header_value_len {
            return Err(ParseError::HeaderTooLarge);
        }
        self.header_value_buf.extend_from_slice(run);

        match end {
            Some(pos) => {
                self.commit_header()?;
                self.state = State::HeaderLineEnd;
                Ok(pos + 1)
            }
            None => Ok(rest.len()),
        }
    }

    /// Move accumulated header name/value buffers into `self.headers`.
    fn commit_header(&mut self) -> Result<(), ParseError> {
        let name = String::from_utf8_lossy(&self.header_name_buf).into_owned();
        let value = String::from_utf8_lossy(&self.header_value_buf).into_owned();

        if self.headers.len() >= self.config.max_headers_count && !self.headers.contains(&name) {
            return Err(ParseError::TooManyHeaders);
        }

        self.headers.insert(name, value);
        self.header_name_buf.clear();
        self.header_value_buf.clear();
        Ok(())
    }

    // ----- public query / finalization ------------------------------------

    /// Returns `true` once the body parser has read the terminating chunk.
    pub fn is_finished(&self) -> bool {
        matches!(&self.state, State::Body(body) if body.is_finished())
    }

    /// The status line, available once its CRLF has been seen.
    pub fn status_line(&self) -> Option<&StatusLine> {
        self.status_line.as_ref()
    }

    /// Headers committed so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Total number of bytes consumed across all `feed` calls.
    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    /// Build the finished response without consuming the parser.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnexpectedEndOfStream`] if the response is not
    /// finished yet.
    pub fn response(&self) -> Result<HttpResponse, ParseError> {
        match (&self.status_line, &self.state) {
            (Some(status), State::Body(body)) if body.is_finished() => Ok(HttpResponse {
                status_code: status.code.clone(),
                status_text: status.text.clone(),
                headers: self.headers.clone(),
                body: body.content().to_vec(),
            }),
            _ => Err(ParseError::UnexpectedEndOfStream),
        }
    }

    /// Consume the parser and return the finished response.
    ///
    /// # Errors
    ///
    /// Returns the parser's stored error, or
    /// [`ParseError::UnexpectedEndOfStream`] if the response is incomplete.
    pub fn finish(self) -> Result<HttpResponse, ParseError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match (self.status_line, self.state) {
            (Some(status), State::Body(body)) if body.is_finished() => Ok(HttpResponse {
                status_code: status.code,
                status_text: status.text,
                headers: self.headers,
                body: body.into_content(),
            }),
            _ => Err(ParseError::UnexpectedEndOfStream),
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn expect_lf(byte: u8, expected: &'static str) -> Result<(), ParseError> {
    if byte == b'\n' {
        Ok(())
    } else {
        Err(ParseError::UnexpectedByte {
            expected,
            found: byte,
        })
    }
}

// ---------------------------------------------------------------------------
// Character classification helpers (RFC 9110)
// ---------------------------------------------------------------------------

/// `tchar` – characters allowed in header names.
///
/// ```text
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
/// ```
#[inline]
fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

/// Bytes permitted inside a header field value:
/// `SP / HTAB / VCHAR / obs-text`.
#[inline]
fn is_field_content_byte(b: u8) -> bool {
    b == b' ' || b == b'\t' || (0x21..=0x7E).contains(&b) || b >= 0x80
}
