use thiserror::Error;

/// Errors that can occur while parsing an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The status line is not `HTTP/1.1 <digits> <reason>`.
    #[error("malformed status line: '{0}'")]
    MalformedStatusLine(String),
    /// A header line does not follow `Name: value`.
    #[error("malformed header line: {0}")]
    MalformedHeaderLine(String),
    /// A chunk-size line contains a byte that is not a hexadecimal digit.
    #[error("invalid chunk size digit 0x{found:02X}")]
    InvalidChunkSizeDigit {
        /// The offending byte.
        found: u8,
    },
    /// A chunk-size line ended before any digit was seen.
    #[error("missing chunk size")]
    MissingChunkSize,
    /// The chunk size does not fit into `usize`.
    #[error("chunk size overflows")]
    ChunkSizeOverflow,
    /// An unexpected byte was encountered during parsing.
    #[error("unexpected byte 0x{found:02X} (expected {expected})")]
    UnexpectedByte {
        /// Human-readable description of what was expected.
        expected: &'static str,
        /// The actual byte value found.
        found: u8,
    },
    /// The status line exceeds the configured maximum size.
    #[error("status line exceeds maximum allowed size")]
    StatusLineTooLarge,
    /// A header name or value exceeds the configured maximum size.
    #[error("header exceeds maximum allowed size")]
    HeaderTooLarge,
    /// The number of headers exceeds the configured maximum.
    #[error("number of headers exceeds maximum")]
    TooManyHeaders,
    /// The decoded body exceeds the configured maximum size.
    #[error("body exceeds maximum allowed size")]
    BodyTooLarge,
    /// The stream ended before a complete response was parsed.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,
}

/// Errors returned by the blocking client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting, writing or reading the socket failed.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    /// The bytes received could not be parsed as a response.
    #[error("response parse error: {0}")]
    Parse(#[from] ParseError),
    /// The JSON request body could not be serialized.
    #[error("request body encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
