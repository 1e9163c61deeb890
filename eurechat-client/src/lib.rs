//! # EURECHAT CLIENT
//!
//! The client half of the network: a [ClientCore] that drives the
//! directory session and issues peer sends, a [PeerListener] that
//! accepts inbound peer connections, and the [UserCache] that tracks the
//! most recent directory query.
//!
//! [ClientCore]:    client::ClientCore
//! [PeerListener]:  peer_listener::PeerListener
//! [UserCache]:     cache::UserCache

pub mod cache;
pub mod client;
pub mod error;
pub mod peer_listener;

pub use cache::UserCache;
pub use client::ClientCore;
pub use error::ClientError;
pub use peer_listener::{PeerEventSink, PeerListener};
