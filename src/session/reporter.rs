//! Setup-level error reporting

use std::fmt;

use log::error;

use crate::utils::EngageError;

/// Failure worth telling the host application about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// Persisted credential was rejected; a new one is being created
    InvalidCredential,
    /// Session could not be established
    Unknown(EngageError),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential => write!(f, "stored access token was rejected"),
            Self::Unknown(e) => write!(f, "session setup failed: {}", e),
        }
    }
}

/// Receives setup errors instead of them crossing the SDK boundary
#[cfg_attr(test, mockall::automock)]
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &SetupError);
}

/// Reporter that writes to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn report(&self, err: &SetupError) {
        error!("{}", err);
    }
}
