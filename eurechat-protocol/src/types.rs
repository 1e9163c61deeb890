//! ## MESSAGE TYPE
//!
//! The closed set of message types understood anywhere in the eurechat
//! network. A [Message] carries its type as a raw string on the wire;
//! this enum is how the directory session handler, the peer listener, and
//! the client core classify a raw message once it is received.
//!
//! [Message]: crate::Message

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    User,
    Pass,
    Bind,
    Leave,
    Query,
    Ack,
    Err,
    Result,
    Ping,
    Pong,
    Message,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::User => "USER",
            MessageType::Pass => "PASS",
            MessageType::Bind => "BIND",
            MessageType::Leave => "LEAVE",
            MessageType::Query => "QUERY",
            MessageType::Ack => "ACK",
            MessageType::Err => "ERR",
            MessageType::Result => "RESULT",
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
            MessageType::Message => "MESSAGE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown message type token; carries the offending token back to the
/// caller so it can be embedded in a human-readable protocol error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownMessageType(pub String);

impl fmt::Display for UnknownMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message type {:?}", self.0)
    }
}

impl std::error::Error for UnknownMessageType {}

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(MessageType::User),
            "PASS" => Ok(MessageType::Pass),
            "BIND" => Ok(MessageType::Bind),
            "LEAVE" => Ok(MessageType::Leave),
            "QUERY" => Ok(MessageType::Query),
            "ACK" => Ok(MessageType::Ack),
            "ERR" => Ok(MessageType::Err),
            "RESULT" => Ok(MessageType::Result),
            "PING" => Ok(MessageType::Ping),
            "PONG" => Ok(MessageType::Pong),
            "MESSAGE" => Ok(MessageType::Message),
            other => Err(UnknownMessageType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_as_str() {
        for t in [
            MessageType::User,
            MessageType::Pass,
            MessageType::Bind,
            MessageType::Leave,
            MessageType::Query,
            MessageType::Ack,
            MessageType::Err,
            MessageType::Result,
            MessageType::Ping,
            MessageType::Pong,
            MessageType::Message,
        ] {
            assert_eq!(MessageType::from_str(t.as_str()), Ok(t));
        }
    }

    #[test]
    fn rejects_unknown_token() {
        assert!(MessageType::from_str("BOGUS").is_err());
    }
}
