//! ## PEER LISTENER
//!
//! Every chat client runs one of these on an OS-assigned ephemeral port.
//! It is what the client announces to the directory via `BIND`, and what
//! other clients connect to when they `chat` or `ping` this user.
//!
//! A connection here tolerates both shapes the protocol allows: a peer
//! that sends exactly one message and disconnects, and a peer that keeps
//! the connection open across several.

use std::net::{Ipv4Addr, SocketAddrV4, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use std::str::FromStr;

use eurechat_protocol::{FramedConnection, MessageType, RecvOutcome};

/// Receives events observed on accepted peer connections. Implemented by
/// whatever owns the user-facing output (the interactive prompt).
pub trait PeerEventSink: Send + Sync {
    fn on_message(&self, sender: &str, payload: &[u8]);
}

pub struct PeerListener {
    port: u16,
}

impl PeerListener {
    /// Binds an ephemeral listening socket and starts accepting peer
    /// connections on a background thread. Returns immediately with the
    /// assigned port so the caller can announce it via `BIND`.
    pub fn start(username: String, sink: Arc<dyn PeerEventSink>) -> std::io::Result<(Self, JoinHandle<()>)> {
        let listener = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))?;
        let port = listener.local_addr()?.port();

        let handle = thread::spawn(move || {
            for incoming in listener.incoming() {
                match incoming {
                    Ok(stream) => {
                        let username = username.clone();
                        let sink = sink.clone();
                        thread::spawn(move || match FramedConnection::new(stream) {
                            Ok(conn) => handle_peer(conn, &username, sink.as_ref()),
                            Err(error) => log::error!("failed to wrap peer connection: {error}"),
                        });
                    }
                    Err(error) => log::error!("peer accept failed: {error}"),
                }
            }
        });

        Ok((Self { port }, handle))
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

fn handle_peer(mut conn: FramedConnection, username: &str, sink: &dyn PeerEventSink) {
    loop {
        match conn.recv() {
            Ok(RecvOutcome::Message(message)) => match MessageType::from_str(&message.msg_type) {
                Ok(MessageType::Ping) => {
                    if conn.send("PONG", vec![username.to_string()], vec![]).is_err() {
                        return;
                    }
                }
                Ok(MessageType::Message) => {
                    let sender = message.args.first().map(String::as_str).unwrap_or("unknown");
                    sink.on_message(sender, &message.payload);
                }
                _ => {
                    log::debug!("ignoring unexpected peer message {}", message.msg_type);
                }
            },
            Ok(RecvOutcome::EndOfStream) => return,
            Ok(RecvOutcome::Timeout) => return,
            Err(error) => {
                log::error!("peer connection error: {error}");
                return;
            }
        }
    }
}
