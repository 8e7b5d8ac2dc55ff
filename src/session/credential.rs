//! Access credentials and their persistence

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use log::debug;

use crate::utils::{Result, SessionError};

/// Opaque bearer token identifying a session
///
/// `Debug` is redacted; the raw value is only reachable through
/// [`expose`](Self::expose).
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw token, for the `Authorization` header and the credential store
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Persisted key/value slot holding the current access token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Previously stored token, if any
    async fn load(&self) -> Result<Option<AccessToken>>;
    /// Replace the stored token
    async fn store(&self, token: &AccessToken) -> Result<()>;
}

/// Process-lifetime credential store
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<AccessToken>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing token
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    pub fn current(&self) -> Option<AccessToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<AccessToken>> {
        Ok(self.current())
    }

    async fn store(&self, token: &AccessToken) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }
}

/// Credential store persisting the token as a single-line file
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<AccessToken>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let raw = contents.trim();
                Ok((!raw.is_empty()).then(|| AccessToken::new(raw)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::CredentialStore(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))
            .into()),
        }
    }

    async fn store(&self, token: &AccessToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SessionError::CredentialStore(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        // Readers never observe a partially written token
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, format!("{}\n", token.expose()))
            .await
            .map_err(|e| {
                SessionError::CredentialStore(format!("cannot write {}: {e}", staging.display()))
            })?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|e| {
            SessionError::CredentialStore(format!("cannot replace {}: {e}", self.path.display()))
        })?;

        debug!("persisted access token to {}", self.path.display());
        Ok(())
    }
}
