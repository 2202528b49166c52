use std::io;

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{Frame, Request};

static CRLF: &[u8; 2] = b"\r\n";

/// Longest `*<count>` or `$<length>` line accepted, terminator excluded.
const MAX_HEADER_LEN: usize = 64;

/// Upper bound on the number of argument slots reserved up front from an untrusted count.
const MAX_PREALLOCATED_ARGS: usize = 64;

/// Upper bound on the read buffer space reserved up front for an announced bulk string. The rest
/// of the buffer grows as the payload actually arrives.
const MAX_PREALLOCATED_BULK: usize = 64 * 1024;

pub const MAX_ARGS: usize = 1024 * 1024;

pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Malformed request framing. The connection that produced it can not be resynchronized and is
/// closed.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("expected '{expected}', got '{}'", .actual.escape_ascii())]
    InvalidDataType { expected: char, actual: u8 },
    #[error("invalid multibulk or bulk length")]
    InvalidLength,
    #[error("negative length {0}")]
    NegativeLength(i64),
    #[error("expected CRLF after bulk string")]
    MissingTerminator,
    #[error("argument count {count} exceeds the limit of {max}")]
    TooManyArguments { count: usize, max: usize },
    #[error("bulk length {len} exceeds the limit of {max} bytes")]
    BulkTooLarge { len: usize, max: usize },
    #[error("connection closed in the middle of a command")]
    UnexpectedEof,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Request decoder and reply encoder.
///
/// Requests are arrays of bulk strings:
///
/// ```text
/// *<argc>\r\n
/// $<len>\r\n<bytes>\r\n   (argc times)
/// ```
///
/// Decoding is resumable. Bytes are dropped from the read buffer as soon as a header or a bulk
/// string is complete, and the command decoded so far is kept in the codec until the rest of it
/// arrives.
#[derive(Debug)]
pub struct FrameCodec {
    max_bulk_len: usize,
    partial: Option<Partial>,
}

#[derive(Debug)]
struct Partial {
    argc: usize,
    args: Vec<Bytes>,
    // Length announced by the last `$` header whose payload has not arrived yet.
    bulk_len: Option<usize>,
}

impl Partial {
    fn new(argc: usize) -> Self {
        Self {
            argc,
            args: Vec::with_capacity(argc.min(MAX_PREALLOCATED_ARGS)),
            bulk_len: None,
        }
    }
}

impl FrameCodec {
    pub fn new(max_bulk_len: usize) -> Self {
        Self {
            max_bulk_len,
            partial: None,
        }
    }

    /// Whether part of a command has been consumed and the rest is still missing.
    pub fn is_mid_command(&self) -> bool {
        self.partial.is_some()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BULK_LEN)
    }
}

impl Decoder for FrameCodec {
    type Item = Request;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut partial = match self.partial.take() {
            Some(partial) => partial,
            None => match read_header(src, b'*')? {
                Some(argc) if argc > MAX_ARGS => {
                    return Err(ProtocolError::TooManyArguments {
                        count: argc,
                        max: MAX_ARGS,
                    })
                }
                Some(argc) => Partial::new(argc),
                None => return Ok(None),
            },
        };

        while partial.args.len() < partial.argc {
            let len = match partial.bulk_len {
                Some(len) => len,
                None => match read_header(src, b'$')? {
                    Some(len) if len > self.max_bulk_len => {
                        return Err(ProtocolError::BulkTooLarge {
                            len,
                            max: self.max_bulk_len,
                        })
                    }
                    Some(len) => {
                        partial.bulk_len = Some(len);
                        len
                    }
                    None => {
                        self.partial = Some(partial);
                        return Ok(None);
                    }
                },
            };

            let needed = len + CRLF.len();
            if src.len() < needed {
                src.reserve((needed - src.len()).min(MAX_PREALLOCATED_BULK));
                self.partial = Some(partial);
                return Ok(None);
            }

            if &src[len..needed] != CRLF {
                return Err(ProtocolError::MissingTerminator);
            }

            let data = src.split_to(len).freeze();
            src.advance(CRLF.len());

            partial.args.push(data);
            partial.bulk_len = None;
        }

        Ok(Some(Request(partial.args)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None if src.is_empty() && !self.is_mid_command() => Ok(None),
            None => Err(ProtocolError::UnexpectedEof),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&frame.serialize());
        Ok(())
    }
}

/// Reads a `<marker><decimal>\r\n` line, returning `None` until the whole line is buffered.
fn read_header(src: &mut BytesMut, marker: u8) -> Result<Option<usize>, ProtocolError> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };

    if first != marker {
        return Err(ProtocolError::InvalidDataType {
            expected: char::from(marker),
            actual: first,
        });
    }

    let limit = src.len().min(MAX_HEADER_LEN + CRLF.len());
    let end = match src[..limit].windows(2).position(|window| window == CRLF) {
        Some(end) => end,
        None if src.len() >= MAX_HEADER_LEN + CRLF.len() => {
            return Err(ProtocolError::InvalidLength)
        }
        None => return Ok(None),
    };

    let value = std::str::from_utf8(&src[1..end])
        .ok()
        .and_then(|digits| digits.parse::<i64>().ok())
        .ok_or(ProtocolError::InvalidLength)?;

    if value < 0 {
        return Err(ProtocolError::NegativeLength(value));
    }

    let value = usize::try_from(value).map_err(|_| ProtocolError::InvalidLength)?;
    src.advance(end + CRLF.len());

    Ok(Some(value))
}
