//! Error types
//!
//! Everything the core can refuse is local and recoverable. Unknown rooms
//! and unknown subscribers are deliberately absent: subscribe and publish
//! create rooms on demand and unsubscribe tolerates duplicate calls.

/// Error type for roomcast operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Client crossed the admission threshold
    RateLimitExceeded {
        /// Client identifier (usually the remote address)
        client: String,
        /// Request count observed by the rejected call
        count: u64,
    },
    /// A payload could not be encoded; nothing was published
    EncodingFailure(String),
    /// A chat post failed validation
    InvalidPost(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RateLimitExceeded { client, count } => {
                write!(f, "Rate limit exceeded for {} ({} requests)", client, count)
            }
            Error::EncodingFailure(reason) => write!(f, "Encoding failure: {}", reason),
            Error::InvalidPost(reason) => write!(f, "Invalid post: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::EncodingFailure(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
