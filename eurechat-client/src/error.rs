use eurechat_protocol::ProtocolError;

/// Every error a [ClientCore] command can surface. The interactive prompt
/// prints these as `"<Command> Error: <message>"` and returns to the
/// prompt; none of them are fatal to the process.
///
/// [ClientCore]: crate::client::ClientCore
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("Use the list command to see the online users")]
    NoCachedUsers,

    #[error("user {0} can't be reached")]
    UserUnreachable(String),

    #[error("the directory connection closed unexpectedly")]
    DirectoryClosed,

    #[error("the directory did not respond in time")]
    DirectoryTimedOut,

    #[error("{0}")]
    Rejected(String),
}
