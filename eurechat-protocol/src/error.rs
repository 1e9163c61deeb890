use std::io;

/// ## PROTOCOL ERROR
///
/// Errors a [Framed Connection] can surface. Framing errors are fatal for
/// the connection they occur on; no resynchronization is attempted once a
/// header fails to parse.
///
/// [Framed Connection]: crate::FramedConnection
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The header line did not match `TYPE LEN [ARGS...]\n`, or it matched
    /// but used a non-UTF8 token.
    #[error("malformed message header: {0}")]
    Framing(String),

    /// Underlying socket I/O failed for a reason other than a timeout.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
