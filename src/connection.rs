use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::info;
use uuid::Uuid;

use crate::codec::{FrameCodec, ProtocolError};
use crate::config::Config;
use crate::frame::{Frame, Request};

/// A client socket paired with its request decoder.
///
/// Data is read from the socket into the read buffer. When a request is decoded, the corresponding
/// bytes are removed from the buffer and whatever is left, an incomplete command, waits there
/// for the next read.
pub struct Connection {
    pub id: Uuid,
    framed: Framed<TcpStream, FrameCodec>,
    idle_timeout: Option<Duration>,
}

impl Connection {
    pub fn new(stream: TcpStream, config: &Config) -> Connection {
        let codec = FrameCodec::new(config.max_bulk_len);

        Connection {
            id: Uuid::new_v4(),
            // Allocate the buffer with 4kb of capacity.
            framed: Framed::with_capacity(stream, codec, 4 * 1024),
            idle_timeout: config.idle_timeout(),
        }
    }

    /// Waits for the next complete command.
    ///
    /// Returns `None` once the peer has closed the connection on a command boundary, or when it
    /// stayed silent for longer than the idle timeout.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ProtocolError> {
        let next = match self.idle_timeout {
            Some(limit) => match timeout(limit, self.framed.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!("Closing connection idle for more than {:?}", limit);
                    return Ok(None);
                }
            },
            None => self.framed.next().await,
        };

        next.transpose()
    }

    /// Writes one reply and flushes it to the socket.
    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        self.framed.send(frame).await
    }
}
