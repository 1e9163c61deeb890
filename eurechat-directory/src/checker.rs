//! ## LIVENESS CHECKER
//!
//! A background thread co-located with the directory. Every [LOOP_WAIT] it
//! snapshots the registered usernames and reverse-probes each one: open a
//! connection to its advertised endpoint, send PING, expect PONG within
//! the idle timeout. Anything else — a connect failure, a wrong reply, a
//! timeout — deregisters that username.
//!
//! The checker never holds the registry lock across network I/O: it reads
//! a snapshot, does all its probing unlocked, and only touches the
//! registry again to deregister a single user at a time.
//!
//! [LOOP_WAIT]: LOOP_WAIT

use std::net::SocketAddr;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use eurechat_protocol::{FramedConnection, MessageType, RecvOutcome};

use crate::registry::Registry;

pub const LOOP_WAIT: Duration = Duration::from_secs(10);

/// Runs the checker loop forever on the calling thread. Callers spawn this
/// on a dedicated background thread at directory startup.
pub fn run(registry: &Registry) {
    loop {
        thread::sleep(LOOP_WAIT);
        run_once(registry);
    }
}

/// Executes a single probe round. Split out from [run] so tests can drive
/// exactly one round without waiting on [LOOP_WAIT].
///
/// [run]: run
/// [LOOP_WAIT]: LOOP_WAIT
pub fn run_once(registry: &Registry) {
    let usernames = registry.usernames();
    log::debug!("{} users are active", usernames.len());

    for username in usernames {
        let Some((_, endpoint)) = registry.query_one(&username) else {
            continue;
        };
        let addr = SocketAddr::from((endpoint.address, endpoint.port));

        if probe(addr, &username) {
            log::info!("USER {username} OK");
        } else {
            log::error!("USER {username} ERROR (no PONG received)");
            registry.deregister(&username);
        }
    }
}

fn probe(addr: SocketAddr, username: &str) -> bool {
    log::debug!("connecting to {addr} for {username}");
    let mut conn = match FramedConnection::connect(addr) {
        Ok(conn) => conn,
        Err(_) => return false,
    };

    if conn.send("PING", vec![], vec![]).is_err() {
        return false;
    }

    match conn.recv() {
        Ok(RecvOutcome::Message(message)) => MessageType::from_str(&message.msg_type) == Ok(MessageType::Pong),
        _ => false,
    }
}
