//! Shared utilities and error types

pub mod error;

pub use error::{CacheError, EngageError, NetworkError, Result, SessionError};
