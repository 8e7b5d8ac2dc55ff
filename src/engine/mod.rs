//! Composition root wiring the client layer together
//!
//! [`EngageCore`] owns one [`NetworkClient`] and hands it to:
//! 1. the [`SessionResolver`] that establishes the credential and identity
//! 2. the [`MediaCache`] that resolves media URLs through the content cache

use std::sync::Arc;

use log::info;

use crate::cache::{ContentCache, MediaCache, MemoryContentCache};
use crate::config::EngageConfig;
use crate::network::NetworkClient;
use crate::session::{CredentialStore, ErrorReporter, LogErrorReporter, SessionResolver};
use crate::utils::Result;

/// The client layer with all of its services
#[derive(Clone)]
pub struct EngageCore {
    network: NetworkClient,
    session: SessionResolver,
    media: MediaCache,
}

impl EngageCore {
    /// Wire the services around one shared HTTP client
    pub fn new(
        config: EngageConfig,
        credential_store: Arc<dyn CredentialStore>,
        content_cache: Arc<dyn ContentCache>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self> {
        let network = NetworkClient::new(&config.network)?;
        let session = SessionResolver::new(
            network.clone(),
            config.session.clone(),
            credential_store,
            reporter,
        );
        let media = MediaCache::new(network.clone(), content_cache, config.media.kind);

        info!(
            "{} v{} ready for {}",
            crate::NAME,
            crate::VERSION,
            config.session.api_origin
        );

        Ok(Self {
            network,
            session,
            media,
        })
    }

    /// In-memory content cache sized from `config.media`, errors go to the log
    pub fn with_defaults(
        config: EngageConfig,
        credential_store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let content_cache = Arc::new(MemoryContentCache::with_limits(
            config.media.max_bytes,
            config.media.max_entries,
        ));
        Self::new(
            config,
            credential_store,
            content_cache,
            Arc::new(LogErrorReporter),
        )
    }

    pub fn network(&self) -> &NetworkClient {
        &self.network
    }

    pub fn session(&self) -> &SessionResolver {
        &self.session
    }

    pub fn media(&self) -> &MediaCache {
        &self.media
    }
}
