//! ## CLIENT CORE
//!
//! Orchestrates the long-lived directory session (authenticate, bind,
//! query, leave) and the short-lived outbound peer sends (chat, ping,
//! secret). The peer listener itself lives in [crate::peer_listener]; this
//! module only starts it and remembers the port it was given.
//!
//! Every public method here maps failures onto [ClientError] rather than
//! panicking or killing the process — a failed `chat` or `ping` is just
//! something to report back to the prompt.

use std::net::{Ipv4Addr, SocketAddrV4, TcpStream};
use std::str::FromStr;
use std::sync::Arc;
use std::thread::JoinHandle;

use eurechat_protocol::{FramedConnection, Message, MessageType, RecvOutcome};

use crate::cache::UserCache;
use crate::error::ClientError;
use crate::peer_listener::{PeerEventSink, PeerListener};

/// Reads one message off `conn`, turning the non-message [RecvOutcome]
/// variants into the matching [ClientError].
fn recv_or_err(conn: &mut FramedConnection) -> Result<Message, ClientError> {
    match conn.recv()? {
        RecvOutcome::Message(message) => Ok(message),
        RecvOutcome::EndOfStream => Err(ClientError::DirectoryClosed),
        RecvOutcome::Timeout => Err(ClientError::DirectoryTimedOut),
    }
}

/// Whether `message` carries the closed-set wire type `expected`.
fn is_type(message: &Message, expected: MessageType) -> bool {
    MessageType::from_str(&message.msg_type) == Ok(expected)
}

pub struct ClientCore {
    directory: FramedConnection,
    username: String,
    cache: UserCache,
    peer_listener: Option<PeerListener>,
    _peer_handle: Option<JoinHandle<()>>,
}

impl ClientCore {
    /// Connects to the directory and runs the USER/PASS handshake. The
    /// peer listener is not started yet; call [ClientCore::bind] next.
    pub fn connect(
        directory_addr: impl std::net::ToSocketAddrs,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let username = username.into();
        let password = password.into();
        let mut directory = FramedConnection::connect(directory_addr)?;

        directory.send("USER", vec![username.clone()], vec![])?;
        let ack = recv_or_err(&mut directory)?;
        if !is_type(&ack, MessageType::Ack) {
            return Err(ClientError::Rejected(String::from_utf8_lossy(&ack.payload).into_owned()));
        }

        directory.send("PASS", vec![password], vec![])?;
        let ack = recv_or_err(&mut directory)?;
        if !is_type(&ack, MessageType::Ack) {
            return Err(ClientError::Rejected(String::from_utf8_lossy(&ack.payload).into_owned()));
        }

        Ok(Self {
            directory,
            username,
            cache: UserCache::new(),
            peer_listener: None,
            _peer_handle: None,
        })
    }

    /// Starts the peer listener and announces it to the directory via
    /// `BIND`. `sink` receives every inbound peer event (PING handling is
    /// automatic; only MESSAGE is forwarded).
    pub fn bind(&mut self, sink: Arc<dyn PeerEventSink>) -> Result<(), ClientError> {
        let (listener, handle) = PeerListener::start(self.username.clone(), sink)?;
        let port = listener.port();

        self.directory
            .send("BIND", vec!["127.0.0.1".to_string(), port.to_string()], vec![])?;
        let reply = recv_or_err(&mut self.directory)?;
        if !is_type(&reply, MessageType::Ack) {
            return Err(ClientError::Rejected(String::from_utf8_lossy(&reply.payload).into_owned()));
        }

        self.peer_listener = Some(listener);
        self._peer_handle = Some(handle);
        Ok(())
    }

    /// Sends `QUERY`, optionally filtered to a single username, and merges
    /// the reply into the local cache. Returns the usernames now known.
    pub fn list(&mut self, filter: Option<&str>) -> Result<Vec<String>, ClientError> {
        let args = match filter {
            Some(name) => vec![name.to_string()],
            None => vec![],
        };
        self.directory.send("QUERY", args, vec![])?;
        let reply = recv_or_err(&mut self.directory)?;
        self.cache.merge_result(&reply.payload);
        Ok(self.cache.usernames().into_iter().map(String::from).collect())
    }

    /// Sends `MESSAGE` to `target`'s cached peer endpoint and returns
    /// without waiting for a reply (none is expected).
    pub fn chat(&mut self, target: &str, text: &str) -> Result<(), ClientError> {
        let (address, port) = self.cached_endpoint(target)?;
        let mut conn = self.connect_to_peer(address, port, target)?;
        conn.send("MESSAGE", vec![self.username.clone()], text.as_bytes().to_vec())?;
        Ok(())
    }

    /// Sends `PING` to `target` and returns the responder's type and
    /// first argument (normally `("PONG", <their username>)`).
    pub fn ping(&mut self, target: &str) -> Result<(String, Option<String>), ClientError> {
        let (address, port) = self.cached_endpoint(target)?;
        let mut conn = self.connect_to_peer(address, port, target)?;
        conn.send("PING", vec![self.username.clone()], vec![])?;
        let reply = recv_or_err(&mut conn)?;
        Ok((reply.msg_type, reply.args.into_iter().next()))
    }

    /// Sends `MESSAGE` to `target`, then reads up to three further
    /// replies, answering any `PING` it sees with `PONG` before closing.
    /// Optional capability; most peers never speak back.
    pub fn secret(&mut self, target: &str, text: &str) -> Result<Vec<Message>, ClientError> {
        let (address, port) = self.cached_endpoint(target)?;
        let mut conn = self.connect_to_peer(address, port, target)?;
        conn.send("MESSAGE", vec![self.username.clone()], text.as_bytes().to_vec())?;

        let mut replies = Vec::new();
        for _ in 0..3 {
            match conn.recv() {
                Ok(RecvOutcome::Message(message)) => {
                    if is_type(&message, MessageType::Ping) {
                        let _ = conn.send("PONG", vec![self.username.clone()], vec![]);
                    }
                    replies.push(message);
                }
                Ok(RecvOutcome::EndOfStream) | Ok(RecvOutcome::Timeout) => break,
                Err(_) => break,
            }
        }
        Ok(replies)
    }

    /// Sends `LEAVE` and awaits the acknowledgement. The directory
    /// session remains open; the reference does not auto-disconnect.
    pub fn leave(&mut self) -> Result<(), ClientError> {
        self.directory.send("LEAVE", vec![], vec![])?;
        let reply = recv_or_err(&mut self.directory)?;
        if !is_type(&reply, MessageType::Ack) {
            return Err(ClientError::Rejected(String::from_utf8_lossy(&reply.payload).into_owned()));
        }
        Ok(())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The ephemeral port the peer listener was bound to, once [bind] has
    /// been called.
    ///
    /// [bind]: ClientCore::bind
    pub fn peer_port(&self) -> Option<u16> {
        self.peer_listener.as_ref().map(PeerListener::port)
    }

    fn cached_endpoint(&self, target: &str) -> Result<(Ipv4Addr, u16), ClientError> {
        if self.cache.is_empty() {
            return Err(ClientError::NoCachedUsers);
        }
        self.cache
            .get(target)
            .ok_or_else(|| ClientError::UserUnreachable(target.to_string()))
    }

    fn connect_to_peer(&self, address: Ipv4Addr, port: u16, target: &str) -> Result<FramedConnection, ClientError> {
        let stream = TcpStream::connect(SocketAddrV4::new(address, port))
            .map_err(|_| ClientError::UserUnreachable(target.to_string()))?;
        Ok(FramedConnection::new(stream)?)
    }
}
