//! ## MESSAGE
//!
//! The raw, untyped form of a wire message: a type token, an ordered list
//! of argument tokens, and an opaque payload. Higher layers (the directory
//! session handler, the peer listener, the client core) interpret the type
//! token against the closed set in [MessageType].
//!
//! [MessageType]: crate::MessageType

use crate::error::ProtocolError;

/// A single `TYPE LEN [ARGS...]\n<PAYLOAD>` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub msg_type: String,
    pub args: Vec<String>,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(msg_type: impl Into<String>, args: Vec<String>, payload: Vec<u8>) -> Self {
        Self {
            msg_type: msg_type.into(),
            args,
            payload,
        }
    }

    /// Serializes this message into its wire form.
    ///
    /// Emits `TYPE LEN\n` when there are no args, `TYPE LEN ARG1 ARG2\n`
    /// otherwise, followed by the raw payload bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut header = format!("{} {}", self.msg_type, self.payload.len());
        for arg in &self.args {
            header.push(' ');
            header.push_str(arg);
        }
        header.push('\n');
        let mut out = header.into_bytes();
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Attempts to extract exactly one [Message] anchored at the start of
/// `buf`.
///
/// Returns `Ok(None)` if the buffer does not yet hold a complete header or
/// a complete payload — the caller should wait for more bytes and retry
/// with nothing consumed. Returns `Ok(Some((message, consumed)))` when a
/// full message was found, where `consumed` is the number of bytes (header
/// + payload) to drop from the front of `buf`. Returns `Err` only for a
/// header that is present but does not match the grammar; this is a fatal
/// framing error and the connection must be closed without resync.
///
/// [Message]: Message
pub fn parse_one(buf: &[u8]) -> Result<Option<(Message, usize)>, ProtocolError> {
    let newline_pos = match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let header_bytes = &buf[..newline_pos];
    let header = std::str::from_utf8(header_bytes)
        .map_err(|_| ProtocolError::Framing("header is not valid UTF-8".to_string()))?;

    let mut tokens = header.split(' ').filter(|s| !s.is_empty());

    let msg_type = tokens
        .next()
        .ok_or_else(|| ProtocolError::Framing("missing message type".to_string()))?;
    if msg_type.is_empty() || !msg_type.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ProtocolError::Framing(format!(
            "invalid message type token: {msg_type:?}"
        )));
    }

    let len_token = tokens
        .next()
        .ok_or_else(|| ProtocolError::Framing("missing length field".to_string()))?;
    let payload_len: usize = len_token
        .parse()
        .map_err(|_| ProtocolError::Framing(format!("invalid length field: {len_token:?}")))?;

    let args: Vec<String> = tokens.map(|s| s.to_string()).collect();

    let header_len = newline_pos + 1;
    let total_len = header_len + payload_len;
    if buf.len() < total_len {
        return Ok(None);
    }

    let payload = buf[header_len..total_len].to_vec();
    Ok(Some((
        Message {
            msg_type: msg_type.to_string(),
            args,
            payload,
        },
        total_len,
    )))
}

/// Repeatedly applies [parse_one] to `buf`, returning every complete
/// message found plus the unconsumed remainder (which may hold a partial
/// header or a partial payload, to be completed by a future read).
///
/// [parse_one]: parse_one
pub fn parse_many(mut buf: &[u8]) -> Result<(Vec<Message>, &[u8]), ProtocolError> {
    let mut messages = Vec::new();
    loop {
        match parse_one(buf)? {
            Some((message, consumed)) => {
                messages.push(message);
                buf = &buf[consumed..];
            }
            None => break,
        }
    }
    Ok((messages, buf))
}
