use std::io;

use thiserror::Error as ThisError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error("server closed the connection")]
    Disconnected,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Minimal client: sends commands in the request encoding and reads back one reply line per
/// command.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Client, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        Ok(Client {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Sends one command and returns its reply without the line terminator.
    pub async fn request<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<String, ClientError> {
        self.writer.write_all(&encode_request(args)).await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<String, ClientError> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line).await? == 0 {
            return Err(ClientError::Disconnected);
        }

        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Encodes `args` as an array of bulk strings.
pub fn encode_request<A: AsRef<[u8]>>(args: &[A]) -> Vec<u8> {
    let mut bytes = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        let arg = arg.as_ref();
        bytes.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        bytes.extend_from_slice(arg);
        bytes.extend_from_slice(b"\r\n");
    }
    bytes
}

/// Splits a line typed at the prompt into arguments.
///
/// Arguments are separated by whitespace. Double quotes group words into a single argument and
/// allow `\"` and `\\` escapes. Returns `None` when a quote is left open.
pub fn split_args(line: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                in_arg = true;
            }
            '\\' if in_quotes => current.push(chars.next()?),
            c if c.is_whitespace() && !in_quotes => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                current.push(c);
                in_arg = true;
            }
        }
    }

    if in_quotes {
        return None;
    }
    if in_arg {
        args.push(current);
    }

    Some(args)
}
