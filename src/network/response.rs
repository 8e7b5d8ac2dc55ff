//! HTTP response classification

use crate::utils::NetworkError;

/// Status-code class, before any body is looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// Any other 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// 1xx, unresolved 3xx, or outside 100..600
    Unexpected,
}

impl StatusClass {
    /// Classify a status code
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Unexpected,
        }
    }
}

/// Outcome of one completed HTTP attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome<T> {
    /// 2xx with a decoded body
    Success(T),
    /// 5xx
    TransientServerError(u16),
    /// 4xx other than 401/403/404
    ClientError(u16),
    Unauthorized,
    Forbidden,
    NotFound,
    /// Missing body where one was expected, or an undefined status
    MalformedResponse(String),
    /// Body present but not decodable
    DecodeError(String),
    /// No status was obtained
    TransportError(String),
}

impl<T> HttpOutcome<T> {
    /// Outcome for a non-2xx status. `None` for 2xx.
    pub fn from_failed_status(status: u16) -> Option<Self> {
        match StatusClass::of(status) {
            StatusClass::Success => None,
            StatusClass::Unauthorized => Some(Self::Unauthorized),
            StatusClass::Forbidden => Some(Self::Forbidden),
            StatusClass::NotFound => Some(Self::NotFound),
            StatusClass::ClientError => Some(Self::ClientError(status)),
            StatusClass::ServerError => Some(Self::TransientServerError(status)),
            StatusClass::Unexpected => Some(Self::MalformedResponse(format!(
                "unexpected status {status}"
            ))),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Convert into a `Result`, mapping every failure onto [`NetworkError`]
    pub fn into_result(self) -> Result<T, NetworkError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::TransientServerError(status) => Err(NetworkError::ServerError(status)),
            Self::ClientError(status) => Err(NetworkError::ClientError(status)),
            Self::Unauthorized => Err(NetworkError::Unauthorized),
            Self::Forbidden => Err(NetworkError::Forbidden),
            Self::NotFound => Err(NetworkError::NotFound),
            Self::MalformedResponse(reason) => Err(NetworkError::MalformedResponse(reason)),
            Self::DecodeError(reason) => Err(NetworkError::Decode(reason)),
            Self::TransportError(reason) => Err(NetworkError::Transport(reason)),
        }
    }

    /// Map the success value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> HttpOutcome<U> {
        match self {
            Self::Success(value) => HttpOutcome::Success(f(value)),
            Self::TransientServerError(s) => HttpOutcome::TransientServerError(s),
            Self::ClientError(s) => HttpOutcome::ClientError(s),
            Self::Unauthorized => HttpOutcome::Unauthorized,
            Self::Forbidden => HttpOutcome::Forbidden,
            Self::NotFound => HttpOutcome::NotFound,
            Self::MalformedResponse(r) => HttpOutcome::MalformedResponse(r),
            Self::DecodeError(r) => HttpOutcome::DecodeError(r),
            Self::TransportError(r) => HttpOutcome::TransportError(r),
        }
    }
}
