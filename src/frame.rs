use std::fmt;

use bytes::Bytes;

/// Every reply line ends with a bare line feed.
pub const TERMINATOR: &[u8; 1] = b"\n";

/// One decoded client request: the command name followed by its arguments, byte for byte.
#[derive(Clone, Debug, PartialEq)]
pub struct Request(pub Vec<Bytes>);

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}

/// A reply value, rendered in the human readable form understood by line oriented clients rather
/// than in the binary request encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
}

impl Frame {
    pub fn ok() -> Frame {
        Frame::Simple("OK".to_string())
    }

    /// Renders the frame as reply text.
    ///
    /// * `Simple` -> the literal text, e.g. `OK`
    /// * `Error` -> `(error) <message>`
    /// * `Integer` -> `(integer) <n>`
    /// * `Bulk` -> the raw bytes, unquoted
    /// * `Null` -> `(nil)`
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => line(s.as_bytes()),
            Frame::Error(s) => {
                let mut bytes = Vec::with_capacity(8 + s.len() + TERMINATOR.len());
                bytes.extend_from_slice(b"(error) ");
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(TERMINATOR);
                bytes
            }
            Frame::Integer(i) => line(format!("(integer) {}", i).as_bytes()),
            Frame::Bulk(bytes) => line(bytes),
            Frame::Null => line(b"(nil)"),
        }
    }
}

fn line(content: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(content.len() + TERMINATOR.len());
    bytes.extend_from_slice(content);
    bytes.extend_from_slice(TERMINATOR);
    bytes
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "{}", s),
            Frame::Error(s) => write!(f, "(error) {}", s),
            Frame::Integer(i) => write!(f, "(integer) {}", i),
            Frame::Bulk(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "(nil)"),
        }
    }
}
