//! ## CLIENT CACHED USER LIST
//!
//! Holds the most recent `QUERY` `RESULT`, parsed into a
//! `username -> (address, port)` map. It is advisory only — a stale entry
//! simply produces a connection failure when the client tries to use it.
//!
//! Parsing tolerates any whitespace between records (not just `\n`), and
//! merges newly seen records into the existing map rather than replacing
//! it outright, matching the reference client.

use std::collections::HashMap;
use std::net::Ipv4Addr;

#[derive(Default)]
pub struct UserCache {
    entries: HashMap<String, (Ipv4Addr, u16)>,
}

impl UserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `RESULT` payload and merges every record it contains into
    /// the cache. Records that fail to parse are skipped; one bad record
    /// does not invalidate the rest of the payload.
    pub fn merge_result(&mut self, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        for token in text.split_whitespace() {
            if let Some((username, address, port)) = parse_record(token) {
                self.entries.insert(username, (address, port));
            }
        }
    }

    pub fn get(&self, username: &str) -> Option<(Ipv4Addr, u16)> {
        self.entries.get(username).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn usernames(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

fn parse_record(token: &str) -> Option<(String, Ipv4Addr, u16)> {
    let mut parts = token.splitn(3, ',');
    let username = parts.next()?;
    let address = parts.next()?;
    let port = parts.next()?;

    if username.is_empty() || !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let address: Ipv4Addr = address.parse().ok()?;
    let port: u16 = port.parse().ok()?;
    Some((username.to_string(), address, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_a_single_record() {
        let mut cache = UserCache::new();
        cache.merge_result(b"alice,127.0.0.1,40001");
        assert_eq!(cache.get("alice"), Some((Ipv4Addr::new(127, 0, 0, 1), 40001)));
    }

    #[test]
    fn merges_newline_separated_records() {
        let mut cache = UserCache::new();
        cache.merge_result(b"alice,127.0.0.1,40001\nbob,127.0.0.1,40002");
        assert_eq!(cache.get("alice").unwrap().1, 40001);
        assert_eq!(cache.get("bob").unwrap().1, 40002);
    }

    #[test]
    fn tolerates_extra_whitespace_between_records() {
        let mut cache = UserCache::new();
        cache.merge_result(b"alice,127.0.0.1,40001   bob,127.0.0.1,40002\n\n");
        assert_eq!(cache.usernames().len(), 2);
    }

    #[test]
    fn empty_result_does_not_evict_existing_entries() {
        let mut cache = UserCache::new();
        cache.merge_result(b"alice,127.0.0.1,40001");
        cache.merge_result(b"");
        assert!(cache.get("alice").is_some());
    }

    #[test]
    fn rebind_overwrites_the_cached_endpoint() {
        let mut cache = UserCache::new();
        cache.merge_result(b"alice,127.0.0.1,40001");
        cache.merge_result(b"alice,127.0.0.1,50000");
        assert_eq!(cache.get("alice").unwrap().1, 50000);
    }

    #[test]
    fn malformed_record_is_skipped() {
        let mut cache = UserCache::new();
        cache.merge_result(b"not-a-valid-record");
        assert!(cache.is_empty());
    }
}
