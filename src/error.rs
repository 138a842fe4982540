use thiserror::Error;

/// Failures raised while talking to the server that hosts a robots.txt
/// file. These are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request for {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("request for {url} failed: {message}")]
    Other { url: String, message: String },
}

/// Errors surfaced by [`RobotsParser::fetch`](crate::RobotsParser::fetch).
///
/// Malformed robots.txt content and unparseable dates are not errors; they
/// degrade to dropped rules and the default expiration respectively.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
}

impl Error {
    /// Whether the fetch gave up because its timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Timeout { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
