use thiserror::Error;

/// Failures of the MAC scheme, its oracle and the sessions holding them.
///
/// All of these are precondition violations by the caller. None of them
/// change on retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacError {
    /// The key is empty, so it cannot be stretched to the message length.
    #[error("invalid key: key must contain at least one character")]
    InvalidKey,

    /// Fewer than two observed pairs to splice together.
    #[error("insufficient history: need at least 2 observed pairs, have {observed}")]
    InsufficientHistory { observed: usize },

    /// No live oracle is bound to the session id.
    #[error("unknown session '{0}'")]
    UnknownSession(String),
}

/// Failures talking to a MAC service over HTTP.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status.
    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },
}
