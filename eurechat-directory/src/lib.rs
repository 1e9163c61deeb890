//! # EURECHAT DIRECTORY SERVICE
//!
//! The central directory clients register with. Owns the [Registry], the
//! per-connection [session] state machine, the [checker] that reaps
//! unreachable clients, and the accept-loop [Server] that ties them
//! together.
//!
//! [Registry]: registry::Registry
//! [session]:  session
//! [checker]:  checker
//! [Server]:   server::Server

pub mod checker;
pub mod registry;
pub mod server;
pub mod session;

pub use registry::Registry;
pub use server::{Server, ServerConfig};
