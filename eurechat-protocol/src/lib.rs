//! # EURECHAT WIRE PROTOCOL
//!
//! This crate implements the [Message Codec] and the [Framed Connection]
//! used by every TCP link in the eurechat network: the long-lived
//! directory session, the short-lived peer connections, and the
//! directory's internal liveness probes.
//!
//! ---------------------------------------------------------------------------
//!
//! ## Wire Format
//!
//! A message is a header line terminated by `\n`, optionally followed by a
//! payload of exactly the declared length:
//!
//! ```text
//! <TYPE> <LEN>[ <ARG1> <ARG2> ...]\n<PAYLOAD bytes>
//! ```
//!
//! `TYPE` is a run of word characters, `LEN` is the exact decimal byte count
//! of the payload that follows, and each arg is a whitespace-free token.
//! There is no escaping: the payload follows the header verbatim.
//!
//! [Message Codec]:      message
//! [Framed Connection]:  FramedConnection

pub mod error;
pub mod framed;
pub mod message;
pub mod types;

pub use error::ProtocolError;
pub use framed::{FramedConnection, RecvOutcome};
pub use message::Message;
pub use types::MessageType;

/// Idle-read timeout applied to every socket wrapped by a [Framed Connection].
///
/// [Framed Connection]: FramedConnection
pub const IDLE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
