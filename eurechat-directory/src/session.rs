//! ## DIRECTORY SESSION HANDLER
//!
//! One instance runs per accepted directory connection. It walks the
//! connection through `AWAITING_USER -> AWAITING_PASS -> AUTHENTICATED`
//! and then serves `BIND` / `QUERY` / `LEAVE` until the peer disconnects,
//! times out, or sends something the state machine does not accept.
//!
//! Every exit from this state machine is final: once a session closes, it
//! is never revisited. Per-session failures are logged and never escape
//! to the accept loop (see [crate::server]).

use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::str::FromStr;
use std::time::Duration;

use eurechat_protocol::{FramedConnection, MessageType, RecvOutcome};

use crate::registry::Registry;

const PORT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

enum SessionState {
    AwaitingUser,
    AwaitingPass { username: String },
    Authenticated { username: String },
}

/// Drives one accepted connection through the full directory protocol
/// until it closes. `conn` is consumed; ownership of the socket is never
/// shared outside this thread.
pub fn run_session(mut conn: FramedConnection, registry: &Registry) {
    match conn.peer_addr() {
        Ok(addr) => log::info!("accepted connection from {addr}"),
        Err(error) => log::debug!("accepted connection with no peer address: {error}"),
    }

    let mut state = SessionState::AwaitingUser;

    loop {
        let outcome = match conn.recv() {
            Ok(outcome) => outcome,
            Err(error) => {
                log::error!("session error: {error}");
                conn.close(Some("unexpected error"));
                return;
            }
        };

        let message = match outcome {
            RecvOutcome::Message(message) => message,
            RecvOutcome::EndOfStream => return,
            RecvOutcome::Timeout => {
                conn.close(Some("shutting down idle connection (timeout)"));
                return;
            }
        };

        let msg_type = MessageType::from_str(&message.msg_type).ok();

        state = match (state, msg_type, message.args.len()) {
            (SessionState::AwaitingUser, Some(MessageType::User), 1) => {
                let username = message.args[0].clone();
                log::debug!("USER {username}");
                if conn
                    .send(
                        "ACK",
                        vec![],
                        format!("hi {username}, authentication required").into_bytes(),
                    )
                    .is_err()
                {
                    return;
                }
                SessionState::AwaitingPass { username }
            }

            (SessionState::AwaitingPass { username }, Some(MessageType::Pass), 1) => {
                let password = &message.args[0];
                if registry.login(&username, password) {
                    if conn
                        .send("ACK", vec![], b"successfully authenticated".to_vec())
                        .is_err()
                    {
                        return;
                    }
                    log::info!("AUTHENTICATED {username}");
                    SessionState::Authenticated { username }
                } else {
                    conn.close(Some("authentication failed"));
                    return;
                }
            }

            (SessionState::Authenticated { username }, Some(MessageType::Bind), 2) => {
                let address = match Ipv4Addr::from_str(&message.args[0]) {
                    Ok(address) => address,
                    Err(_) => {
                        conn.close(Some("invalid bind notification"));
                        return;
                    }
                };
                let port: u16 = match message.args[1].parse() {
                    Ok(port) => port,
                    Err(_) => {
                        conn.close(Some("invalid bind notification"));
                        return;
                    }
                };

                if port_test(address, port) {
                    registry.register(&username, address, port);
                    log::info!("REGISTER {username} {address}:{port}");
                    if conn
                        .send(
                            "ACK",
                            vec![],
                            format!("bound successfully to {address}:{port}").into_bytes(),
                        )
                        .is_err()
                    {
                        return;
                    }
                } else {
                    log::error!("port test failed for {username} at {address}:{port}");
                    conn.close(Some("invalid bind notification"));
                    return;
                }
                SessionState::Authenticated { username }
            }

            (SessionState::Authenticated { username }, Some(MessageType::Query), n) if n <= 1 => {
                let filter = message.args.first().filter(|s| !s.is_empty());
                let payload = match filter {
                    Some(target) => registry
                        .query_one(target)
                        .map(|(name, endpoint)| format!("{name},{},{}", endpoint.address, endpoint.port))
                        .unwrap_or_default(),
                    None => registry
                        .query_all()
                        .into_iter()
                        .map(|(name, endpoint)| format!("{name},{},{}", endpoint.address, endpoint.port))
                        .collect::<Vec<_>>()
                        .join("\n"),
                };
                if conn.send("RESULT", vec![], payload.into_bytes()).is_err() {
                    return;
                }
                SessionState::Authenticated { username }
            }

            (SessionState::Authenticated { username }, Some(MessageType::Leave), 0) => {
                registry.deregister(&username);
                log::info!("DEREGISTER {username}");
                if conn
                    .send("ACK", vec![], b"deregistered from directory".to_vec())
                    .is_err()
                {
                    return;
                }
                SessionState::Authenticated { username }
            }

            (_, _, _) => {
                conn.close(Some(&format!(
                    "I did not understand the message {}",
                    message.msg_type
                )));
                return;
            }
        };
    }
}

/// Opens a TCP connection to `(address, port)` and closes it immediately.
/// Success means the endpoint is reachable and worth advertising.
fn port_test(address: Ipv4Addr, port: u16) -> bool {
    let addr = SocketAddr::from((address, port));
    match TcpStream::connect_timeout(&addr, PORT_TEST_TIMEOUT) {
        Ok(stream) => {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eurechat_protocol::FramedConnection;
    use std::net::{Ipv4Addr, SocketAddrV4, TcpListener};
    use std::thread;

    fn spawn_directory() -> (SocketAddr, std::sync::Arc<Registry>) {
        let listener = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let registry = std::sync::Arc::new(Registry::new());
        let registry_clone = registry.clone();
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let registry_clone = registry_clone.clone();
                thread::spawn(move || {
                    let conn = FramedConnection::new(stream).unwrap();
                    run_session(conn, &registry_clone);
                });
            }
        });
        (addr, registry)
    }

    #[test]
    fn handshake_then_query_with_no_bind() {
        let (addr, _registry) = spawn_directory();
        let mut client = FramedConnection::connect(addr).unwrap();

        client.send("USER", vec!["alice".to_string()], vec![]).unwrap();
        match client.recv().unwrap() {
            RecvOutcome::Message(m) => assert_eq!(m.msg_type, "ACK"),
            other => panic!("{other:?}"),
        }

        client.send("PASS", vec!["secret".to_string()], vec![]).unwrap();
        match client.recv().unwrap() {
            RecvOutcome::Message(m) => {
                assert_eq!(m.msg_type, "ACK");
                assert_eq!(m.payload, b"successfully authenticated");
            }
            other => panic!("{other:?}"),
        }

        client.send("QUERY", vec![], vec![]).unwrap();
        match client.recv().unwrap() {
            RecvOutcome::Message(m) => {
                assert_eq!(m.msg_type, "RESULT");
                assert!(m.payload.is_empty());
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn bind_registers_a_reachable_peer() {
        let (addr, registry) = spawn_directory();

        // A listener acting as alice's peer endpoint, so the port test succeeds.
        let peer_listener = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        let peer_addr = peer_listener.local_addr().unwrap();
        thread::spawn(move || {
            let _ = peer_listener.accept();
        });

        let mut client = FramedConnection::connect(addr).unwrap();
        client.send("USER", vec!["alice".to_string()], vec![]).unwrap();
        client.recv().unwrap();
        client.send("PASS", vec!["secret".to_string()], vec![]).unwrap();
        client.recv().unwrap();

        client
            .send(
                "BIND",
                vec!["127.0.0.1".to_string(), peer_addr.port().to_string()],
                vec![],
            )
            .unwrap();
        match client.recv().unwrap() {
            RecvOutcome::Message(m) => assert_eq!(m.msg_type, "ACK"),
            other => panic!("{other:?}"),
        }

        let (name, endpoint) = registry.query_one("alice").unwrap();
        assert_eq!(name, "alice");
        assert_eq!(endpoint.port, peer_addr.port());
    }

    #[test]
    fn unreachable_bind_is_rejected_and_closes_connection() {
        let (addr, registry) = spawn_directory();

        let mut client = FramedConnection::connect(addr).unwrap();
        client.send("USER", vec!["alice".to_string()], vec![]).unwrap();
        client.recv().unwrap();
        client.send("PASS", vec!["secret".to_string()], vec![]).unwrap();
        client.recv().unwrap();

        // Port 1 on loopback should not have a listener in this test environment.
        client
            .send("BIND", vec!["127.0.0.1".to_string(), "1".to_string()], vec![])
            .unwrap();

        // The directory closes the connection (optionally with an ERR first)
        // rather than registering the bind.
        loop {
            match client.recv() {
                Ok(RecvOutcome::Message(m)) if m.msg_type == "ACK" => {
                    panic!("unreachable bind should not be acknowledged")
                }
                Ok(RecvOutcome::Message(_)) => continue,
                Ok(RecvOutcome::EndOfStream) | Err(_) => break,
                Ok(RecvOutcome::Timeout) => panic!("unexpected timeout"),
            }
        }
        assert!(registry.query_one("alice").is_none());
    }

    #[test]
    fn leave_deregisters_and_acknowledges() {
        let (addr, registry) = spawn_directory();
        registry.register("alice", Ipv4Addr::new(127, 0, 0, 1), 9999);

        let mut client = FramedConnection::connect(addr).unwrap();
        client.send("USER", vec!["alice".to_string()], vec![]).unwrap();
        client.recv().unwrap();
        client.send("PASS", vec!["secret".to_string()], vec![]).unwrap();
        client.recv().unwrap();

        client.send("LEAVE", vec![], vec![]).unwrap();
        match client.recv().unwrap() {
            RecvOutcome::Message(m) => {
                assert_eq!(m.msg_type, "ACK");
                assert_eq!(m.payload, b"deregistered from directory");
            }
            other => panic!("{other:?}"),
        }
        assert!(registry.query_one("alice").is_none());
    }

    #[test]
    fn unexpected_message_closes_the_session() {
        let (addr, _registry) = spawn_directory();
        let mut client = FramedConnection::connect(addr).unwrap();
        client.send("BIND", vec![], vec![]).unwrap();
        match client.recv().unwrap() {
            RecvOutcome::Message(m) => assert_eq!(m.msg_type, "ERR"),
            other => panic!("{other:?}"),
        }
    }
}
