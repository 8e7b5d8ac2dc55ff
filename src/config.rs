//! Runtime configuration
//!
//! Every section has sensible defaults except the session endpoint, which
//! must name a real application.

use std::env;
use std::time::Duration;

use url::Url;

use crate::cache::MediaKind;
use crate::utils::{EngageError, Result};

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Whole-request timeout, surfaced as a transport error when exceeded
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// User-Agent header sent on every request
    pub user_agent: String,
    /// Idle pooled connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("engage-core/{}", crate::VERSION),
            pool_max_idle_per_host: 8,
        }
    }
}

/// Where the session layer finds its application
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Origin of the engagement API, e.g. `https://api.example.com`
    pub api_origin: Url,
    /// Application client id
    pub client_id: String,
}

impl SessionConfig {
    pub fn new(api_origin: &str, client_id: impl Into<String>) -> Result<Self> {
        let api_origin = Url::parse(api_origin)
            .map_err(|e| EngageError::Config(format!("invalid api origin {api_origin:?}: {e}")))?;
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(EngageError::Config("client id must not be empty".into()));
        }
        Ok(Self {
            api_origin,
            client_id,
        })
    }

    /// `{origin}/api/v1/applications/{client_id}/`
    ///
    /// Any path on the origin is kept as a prefix and the client id is
    /// percent-encoded as a single segment.
    pub fn application_url(&self) -> Result<Url> {
        let mut url = self.api_origin.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| {
                EngageError::Config(format!("api origin {} cannot carry a path", self.api_origin))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "applications", self.client_id.as_str(), ""]);
        Ok(url)
    }
}

/// Media cache limits
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Maximum bytes kept by the in-memory content cache
    pub max_bytes: usize,
    /// Maximum entries kept by the in-memory content cache
    pub max_entries: usize,
    /// What downloaded bytes must look like before they are cached
    pub kind: MediaKind,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_bytes: 50 * 1024 * 1024, // 50MB
            max_entries: 1000,
            kind: MediaKind::Image,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct EngageConfig {
    pub network: NetworkConfig,
    pub session: SessionConfig,
    pub media: MediaConfig,
}

impl EngageConfig {
    /// Configuration with defaults for everything but the session endpoint
    pub fn new(session: SessionConfig) -> Self {
        Self {
            network: NetworkConfig::default(),
            session,
            media: MediaConfig::default(),
        }
    }

    /// Load from `ENGAGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let origin = required_var("ENGAGE_API_ORIGIN")?;
        let client_id = required_var("ENGAGE_CLIENT_ID")?;
        let mut config = Self::new(SessionConfig::new(&origin, client_id)?);

        if let Some(secs) = parsed_var::<u64>("ENGAGE_REQUEST_TIMEOUT_SECS")? {
            config.network.request_timeout = Duration::from_secs(secs);
        }
        if let Some(mb) = parsed_var::<usize>("ENGAGE_MEDIA_CACHE_MB")? {
            config.media.max_bytes = megabytes(mb)?;
        }

        Ok(config)
    }
}

fn megabytes(mb: usize) -> Result<usize> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| EngageError::Config(format!("ENGAGE_MEDIA_CACHE_MB={mb} is too large")))
}

fn required_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| EngageError::Config(format!("{name} is not set")))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EngageError::Config(format!("{name} has invalid value {raw:?}"))),
        Err(_) => Ok(None),
    }
}
