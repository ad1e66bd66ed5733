use thiserror::Error;
use tokio::time::error::Elapsed;

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum SourceQueryError {
    /// Returned if an operation is called before `connect()` or after `close()`.
    #[error("not connected to server")]
    NotConnected,
    /// Returned if the server did not respond in time.
    #[error("request timeout")]
    Timeout(#[from] Elapsed),
    /// Returned if a response is shorter than a fixed-size block it must contain.
    #[error("response too short")]
    ShortResponse,
    /// Returned if a split packet leaves no room for a payload.
    #[error("invalid response")]
    InvalidResponse,
    /// Returned if the response type byte is not the one we asked for.
    #[error("unexpected response type: {actual:#04X}, expected: {expected:#04X}")]
    ProtocolMismatch { expected: u8, actual: u8 },
    /// The server answered with S2C_CHALLENGE. Carries the challenge number,
    /// which the client caches before retrying. Never returned from the public
    /// query operations.
    #[error("challenge required")]
    ChallengeRequired(i32),
    /// Returned if the server kept answering with challenges.
    #[error("too many retries")]
    TooManyRetries,
    /// Returned if the challenge request finished without the server issuing one.
    #[error("challenge not received")]
    ChallengeNotReceived,
    /// Reserved for queries a server cannot answer.
    #[error("unsupported feature")]
    Unsupported,
    /// Returned if the first four bytes are neither the single nor the split header.
    #[error("unknown header: {0:#X}")]
    UnknownPacketHeader(i32),
    /// Returned if no local UDP port could be bound.
    #[error("failed to bind a local port")]
    FailedPortBind(#[source] std::io::Error),
    /// Returned if the host cannot be resolved or connected to.
    #[error("host cannot be reached")]
    UnreachableHost(#[source] std::io::Error),
    /// The socket is open, but there was a problem writing to it.
    #[error("cannot send message to host")]
    SendError(#[source] std::io::Error),
    /// The socket is open, but there was a problem reading from it.
    #[error("cannot receive response from host")]
    ReceiveError(#[source] std::io::Error),
}
