use std::num::NonZeroUsize;

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Accumulating hex digits of the next chunk size.
    AwaitingLength { length: usize, digits: usize },
    /// Skipping a `;` chunk extension up to the CR of the size line.
    Extension { length: usize },
    /// CR of a non-zero size line seen, LF expected.
    AwaitingLengthEnd { length: NonZeroUsize },
    ReadingChunk { remaining: NonZeroUsize },
    /// Chunk data consumed, CR expected.
    AwaitingNewLine,
    AwaitingNewLineEnd,
    /// The zero-size chunk was read; nothing more is consumed.
    Finished,
}

// ---------------------------------------------------------------------------
// ChunkedBodyParser
// ---------------------------------------------------------------------------

/// Decoder for a `Transfer-Encoding: chunked` body.
///
/// Each chunk is `<hex-size>\r\n<data>\r\n`; a size of zero ends the body.
/// The parser is finished as soon as the CR of the zero-size line is seen
/// and consumes no byte after it, so trailer fields (if any) are left to
/// the caller.
///
/// ```rust
/// use chunkwire::ChunkedBodyParser;
///
/// let mut body = ChunkedBodyParser::new();
/// body.receive(b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n").unwrap();
/// assert!(body.is_finished());
/// assert_eq!(body.content(), b"Wikipedia");
/// ```
#[derive(Debug, Clone)]
pub struct ChunkedBodyParser {
    state: ChunkState,
    content: Vec<u8>,
    max_body_size: usize,
}

impl ChunkedBodyParser {
    /// Create a decoder without a body size limit.
    pub fn new() -> Self {
        Self::with_limit(usize::MAX)
    }

    /// Create a decoder that fails once the decoded body would exceed
    /// `max_body_size` bytes.
    pub fn with_limit(max_body_size: usize) -> Self {
        Self {
            state: ChunkState::AwaitingLength { length: 0, digits: 0 },
            content: Vec::new(),
            max_body_size,
        }
    }

    /// Returns `true` once the terminating zero-size chunk was read.
    pub fn is_finished(&self) -> bool {
        self.state == ChunkState::Finished
    }

    /// The body decoded so far.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consume the decoder and return the decoded body.
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// Advance the decoder by exactly one byte.
    ///
    /// Bytes received after the decoder finished are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the byte violates the chunk framing.
    pub fn receive_char(&mut self, byte: u8) -> Result<(), ParseError> {
        self.receive(&[byte]).map(|_| ())
    }

    /// Feed a run of bytes.
    ///
    /// Returns the number of bytes consumed. This is less than
    /// `data.len()` only when the decoder finished part-way through.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the input violates the chunk framing or
    /// the body size limit.
    pub fn receive(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut i = 0;

        while i < data.len() {
            match self.state {
                ChunkState::Finished => return Ok(i),

                // Bulk copy of chunk data.
                ChunkState::ReadingChunk { remaining } => {
                    let take = remaining.get().min(data.len() - i);
                    self.content.extend_from_slice(&data[i..i + take]);
                    i += take;
                    self.state = match NonZeroUsize::new(remaining.get() - take) {
                        Some(remaining) => ChunkState::ReadingChunk { remaining },
                        None => ChunkState::AwaitingNewLine,
                    };
                }

                _ => {
                    self.step(data[i])?;
                    i += 1;
                }
            }
        }

        Ok(i)
    }

    fn step(&mut self, byte: u8) -> Result<(), ParseError> {
        match self.state {
            ChunkState::AwaitingLength { length, digits } => match byte {
                b'\r' => {
                    if digits == 0 {
                        return Err(ParseError::MissingChunkSize);
                    }
                    self.end_size_line(length)?;
                }
                b';' => {
                    if digits == 0 {
                        return Err(ParseError::MissingChunkSize);
                    }
                    self.state = ChunkState::Extension { length };
                }
                _ => {
                    let digit = hex_value(byte)
                        .ok_or(ParseError::InvalidChunkSizeDigit { found: byte })?;
                    let length = length
                        .checked_mul(16)
                        .and_then(|l| l.checked_add(digit))
                        .ok_or(ParseError::ChunkSizeOverflow)?;
                    self.state = ChunkState::AwaitingLength {
                        length,
                        digits: digits + 1,
                    };
                }
            },

            ChunkState::Extension { length } => {
                if byte == b'\r' {
                    self.end_size_line(length)?;
                }
            }

            ChunkState::AwaitingLengthEnd { length } => {
                expect(byte, b'\n', "LF after chunk size CR")?;
                self.state = ChunkState::ReadingChunk { remaining: length };
            }

            ChunkState::AwaitingNewLine => {
                expect(byte, b'\r', "CR after chunk data")?;
                self.state = ChunkState::AwaitingNewLineEnd;
            }

            ChunkState::AwaitingNewLineEnd => {
                expect(byte, b'\n', "LF after chunk data CR")?;
                self.state = ChunkState::AwaitingLength { length: 0, digits: 0 };
            }

            // Chunk data and Finished never reach the byte-by-byte path.
            ChunkState::ReadingChunk { .. } | ChunkState::Finished => {
                unreachable!("handled by bulk-copy or early-return paths");
            }
        }
        Ok(())
    }

    /// Handle the CR that terminates a chunk-size line.
    fn end_size_line(&mut self, length: usize) -> Result<(), ParseError> {
        tracing::trace!(length, "chunk size line");
        match NonZeroUsize::new(length) {
            None => {
                tracing::debug!(body_len = self.content.len(), "chunked body complete");
                self.state = ChunkState::Finished;
            }
            Some(length) => {
                if length.get() > self.max_body_size.saturating_sub(self.content.len()) {
                    return Err(ParseError::BodyTooLarge);
                }
                self.content.reserve(length.get().min(65_536));
                self.state = ChunkState::AwaitingLengthEnd { length };
            }
        }
        Ok(())
    }
}

impl Default for ChunkedBodyParser {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn expect(byte: u8, wanted: u8, expected: &'static str) -> Result<(), ParseError> {
    if byte == wanted {
        Ok(())
    } else {
        Err(ParseError::UnexpectedByte {
            expected,
            found: byte,
        })
    }
}

#[inline]
fn hex_value(byte: u8) -> Option<usize> {
    (byte as char).to_digit(16).map(|d| d as usize)
}
