use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by the Keystone client library.
///
/// HTTP statuses are returned as data by the transport; only the layers that
/// interpret them (token manager, query engine) turn them into errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid query string `{query}`: {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("failed to build request: {0}")]
    RequestBuild(String),

    /// `status` is 0 when no response was received at all.
    #[error("transport failure (status {status}): {message}")]
    Transport { status: u16, message: String },

    #[error("session error: {0}")]
    Session(String),

    #[error("token error: {0}")]
    Token(String),

    #[error("failed to persist token to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("query to {endpoint} failed with status code: {status}")]
    Query { endpoint: String, status: u16 },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("no access token held; authenticate first")]
    NotAuthenticated,

    #[error("invalid name pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    pub(crate) fn decode(context: &str, err: serde_json::Error) -> Self {
        Error::Decode(format!("{context}: {err}"))
    }
}
