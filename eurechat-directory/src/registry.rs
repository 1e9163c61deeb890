//! ## DIRECTORY REGISTRY
//!
//! The directory's only piece of shared mutable state: a
//! `username -> (address, port)` map guarded by a single exclusive lock.
//! Every method here is safe to call from any number of session threads
//! and the liveness checker concurrently.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

/// A registered client's advertised peer endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub address: Ipv4Addr,
    pub port: u16,
}

#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<String, Endpoint>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the endpoint for `username`.
    pub fn register(&self, username: &str, address: Ipv4Addr, port: u16) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(username.to_string(), Endpoint { address, port });
    }

    /// Removes `username` if present; a no-op otherwise.
    pub fn deregister(&self, username: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(username);
    }

    /// Returns a snapshot of every registered `(username, endpoint)` pair.
    pub fn query_all(&self) -> Vec<(String, Endpoint)> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .map(|(name, endpoint)| (name.clone(), *endpoint))
            .collect()
    }

    /// Returns the single entry for `username`, if registered.
    pub fn query_one(&self, username: &str) -> Option<(String, Endpoint)> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(username)
            .map(|endpoint| (username.to_string(), *endpoint))
    }

    /// Reference access-control hook. The reference directory has no real
    /// user database, so every credential is accepted.
    pub fn login(&self, _username: &str, _password: &str) -> bool {
        true
    }

    /// All currently registered usernames, used by the liveness checker to
    /// take a probe-round snapshot without holding the lock across I/O.
    pub fn usernames(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap();
        entries.keys().cloned().collect()
    }
}
