//! Session and identity
//!
//! Resolves the caller's access credential and profile against the
//! engagement API, persists the credential, and fans nickname changes out
//! to observers.

pub mod credential;
pub mod profile;
pub mod reporter;
pub mod resolver;

pub use credential::{AccessToken, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use profile::{ApplicationResource, Identity, ProfileResource};
pub use reporter::{ErrorReporter, LogErrorReporter, SetupError};
pub use resolver::{NicknameObserver, SessionResolver, SessionState};
