use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::error::PeerError;
use super::message::{Handshake, Message, HANDSHAKE_LEN};

/// Per-frame cap. Metadata pieces are 16 KiB, so anything near this is
/// already hostile.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Framed reader/writer over a peer TCP connection.
///
/// Carries no timeouts of its own: the metadata exchange runs under one
/// overall deadline owned by the caller, which aborts all pending I/O
/// here when it expires.
pub struct PeerTransport {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl PeerTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(32 * 1024),
        }
    }

    pub async fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), PeerError> {
        self.stream.write_all(&handshake.encode()).await?;
        Ok(())
    }

    pub async fn receive_handshake(&mut self) -> Result<Handshake, PeerError> {
        self.fill_to(HANDSHAKE_LEN).await?;
        let data = self.read_buf.split_to(HANDSHAKE_LEN);
        Handshake::decode(&data)
    }

    pub async fn send_message(&mut self, message: &Message) -> Result<(), PeerError> {
        self.stream.write_all(&message.encode()).await?;
        Ok(())
    }

    pub async fn receive_message(&mut self) -> Result<Message, PeerError> {
        self.fill_to(4).await?;

        let length = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]) as usize;

        if length > MAX_FRAME_SIZE {
            return Err(PeerError::FrameTooLarge(length));
        }

        self.fill_to(4 + length).await?;
        let data = self.read_buf.split_to(4 + length);
        Message::decode(data.freeze())
    }

    async fn fill_to(&mut self, len: usize) -> Result<(), PeerError> {
        while self.read_buf.len() < len {
            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(PeerError::ConnectionClosed);
            }
        }
        Ok(())
    }
}
