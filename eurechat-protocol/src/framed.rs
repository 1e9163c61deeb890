//! ## FRAMED CONNECTION
//!
//! Wraps a connected [TcpStream] with send-one-message / receive-one-message
//! semantics over an internal reassembly buffer, and enforces the
//! [IDLE_TIMEOUT] on every read.
//!
//! [TcpStream]:    std::net::TcpStream
//! [IDLE_TIMEOUT]: crate::IDLE_TIMEOUT

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::error::ProtocolError;
use crate::message::{parse_one, Message};
use crate::types::MessageType;
use crate::IDLE_TIMEOUT;

/// Outcome of a single [FramedConnection::recv] call.
///
/// [FramedConnection::recv]: FramedConnection::recv
#[derive(Debug)]
pub enum RecvOutcome {
    Message(Message),
    /// The peer closed the connection with nothing left to parse.
    EndOfStream,
    /// No complete message arrived within [IDLE_TIMEOUT].
    ///
    /// [IDLE_TIMEOUT]: crate::IDLE_TIMEOUT
    Timeout,
}

/// A byte-stream socket plus the reassembly buffer needed to turn it into
/// a message stream.
pub struct FramedConnection {
    stream: TcpStream,
    buffer: Vec<u8>,
}

const READ_CHUNK: usize = 1024;

impl FramedConnection {
    /// Wraps an already-connected stream, applying the idle read/write
    /// timeout required by every link in this network.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_read_timeout(Some(IDLE_TIMEOUT))?;
        stream.set_write_timeout(Some(IDLE_TIMEOUT))?;
        Ok(Self {
            stream,
            buffer: Vec::new(),
        })
    }

    /// Connects to `addr` and wraps the resulting stream.
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::new(stream)
    }

    /// Serializes one message and writes it to the socket, retrying short
    /// writes until the whole buffer is sent.
    pub fn send(
        &mut self,
        msg_type: impl Into<String>,
        args: Vec<String>,
        payload: Vec<u8>,
    ) -> Result<(), ProtocolError> {
        let message = Message::new(msg_type, args, payload);
        let bytes = message.serialize();
        self.stream.write_all(&bytes)?;
        Ok(())
    }

    /// Pulls chunks off the socket into the reassembly buffer and attempts
    /// a parse after each one, returning the first fully-framed message.
    pub fn recv(&mut self) -> Result<RecvOutcome, ProtocolError> {
        loop {
            if let Some((message, consumed)) = parse_one(&self.buffer)? {
                self.buffer.drain(..consumed);
                return Ok(RecvOutcome::Message(message));
            }

            let mut chunk = [0u8; READ_CHUNK];
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return if self.buffer.is_empty() {
                        Ok(RecvOutcome::EndOfStream)
                    } else {
                        Err(ProtocolError::Io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed with a partial message in flight",
                        )))
                    };
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if is_timeout(&e) => return Ok(RecvOutcome::Timeout),
                Err(e) => return Err(ProtocolError::Io(e)),
            }
        }
    }

    /// Shuts the connection down. If `reason` is given, best-effort sends
    /// an ERR carrying it as payload first.
    pub fn close(mut self, reason: Option<&str>) {
        if let Some(reason) = reason {
            let _ = self.send(MessageType::Err.as_str(), vec![], reason.as_bytes().to_vec());
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
