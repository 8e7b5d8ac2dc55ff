//! Error types for engage-core
//!
//! Every error here is `Clone`: a single settled failure is handed verbatim
//! to every caller that joined the same in-flight resolution.

use thiserror::Error;

/// Main error type for engage-core operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngageError {
    /// Network-related errors
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    /// Content cache errors
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    /// Session and credential errors
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),
    /// A background computation panicked or was aborted
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

/// Network-specific errors, one per non-success response outcome
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// URL could not be parsed
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// DNS, connect, TLS, timeout or reset before a status was obtained
    #[error("transport failure: {0}")]
    Transport(String),
    /// 401
    #[error("unauthorized")]
    Unauthorized,
    /// 403
    #[error("forbidden")]
    Forbidden,
    /// 404
    #[error("not found")]
    NotFound,
    /// Any other 4xx
    #[error("client error (HTTP {0})")]
    ClientError(u16),
    /// 5xx
    #[error("server error (HTTP {0})")]
    ServerError(u16),
    /// Missing body, or a status the protocol does not define
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Body was present but could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl NetworkError {
    /// Whether this error proves the presented credential was rejected
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }
}

/// Media/content cache errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Downloaded bytes are not the expected media type
    #[error("media at {url} is not decodable: {reason}")]
    UndecodableMedia { url: String, reason: String },
}

/// Session-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Persisted credential store could not be read or written
    #[error("credential store failure: {0}")]
    CredentialStore(String),
    /// Nickname rejected before contacting the server
    #[error("invalid nickname: {0:?}")]
    InvalidNickname(String),
}

/// Convenience Result type for engage-core operations
pub type Result<T> = std::result::Result<T, EngageError>;
