//! Media cache
//!
//! Resolves URLs to bytes: content cache first, then a single deduplicated
//! download per URL whose result is written back to the content cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures::future::{join_all, try_join_all};
use log::{debug, warn};
use tokio::task::JoinHandle;
use url::Url;

use super::ContentCache;
use crate::network::{NetworkClient, RequestDescriptor, parse_url};
use crate::sync::{Flight, Retention, SingleFlight};
use crate::utils::{CacheError, EngageError, Result};

/// What downloaded bytes must be before they are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A format the `image` crate recognises
    Image,
    /// Anything
    Any,
}

impl MediaKind {
    fn validate(&self, url: &str, bytes: &[u8]) -> Result<()> {
        match self {
            Self::Image => image::guess_format(bytes).map(|_| ()).map_err(|e| {
                CacheError::UndecodableMedia {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
            Self::Any => Ok(()),
        }
    }
}

/// Outcome of a batch prefetch, available once every URL has finished
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub requested: usize,
    pub failed: Vec<(String, EngageError)>,
}

impl PrefetchReport {
    pub fn succeeded(&self) -> usize {
        self.requested - self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// URL → bytes resolver backed by a [`ContentCache`]
///
/// Cloning is cheap; clones share the cache and the in-flight downloads.
#[derive(Clone)]
pub struct MediaCache {
    client: NetworkClient,
    store: Arc<dyn ContentCache>,
    downloads: SingleFlight<String, Bytes>,
    kind: MediaKind,
}

impl MediaCache {
    pub fn new(client: NetworkClient, store: Arc<dyn ContentCache>, kind: MediaKind) -> Self {
        Self {
            client,
            store,
            downloads: SingleFlight::new(Retention::Forget),
            kind,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Number of downloads currently running
    pub fn downloads_in_flight(&self) -> usize {
        self.downloads.in_flight_count()
    }

    /// Bytes for `url`, downloading on a cache miss
    pub async fn get(&self, url: &str) -> Result<Bytes> {
        let url = parse_url(url)?;
        let key = url.to_string();
        if let Some(bytes) = self.store.get(&key).await {
            debug!("cache hit {}", key);
            return Ok(bytes);
        }
        self.download(url, key).await
    }

    /// Bytes for every URL, in input order. The first failure fails the batch.
    pub async fn get_batch<S: AsRef<str>>(&self, urls: &[S]) -> Result<Vec<Bytes>> {
        try_join_all(urls.iter().map(|url| self.get(url.as_ref()))).await
    }

    /// Start fetching `url` into the cache in the background.
    ///
    /// The handle may be dropped; awaiting it yields the outcome.
    pub fn prefetch(&self, url: &str) -> JoinHandle<Result<()>> {
        let cache = self.clone();
        let url = url.to_string();
        tokio::spawn(async move { cache.prefetch_one(&url).await })
    }

    /// Prefetch every URL, returning once each has succeeded or failed
    pub async fn prefetch_batch<S: AsRef<str>>(&self, urls: &[S]) -> PrefetchReport {
        let outcomes = join_all(urls.iter().map(|url| async move {
            let url = url.as_ref();
            (url.to_string(), self.prefetch_one(url).await)
        }))
        .await;

        PrefetchReport {
            requested: urls.len(),
            failed: outcomes
                .into_iter()
                .filter_map(|(url, outcome)| outcome.err().map(|e| (url, e)))
                .collect(),
        }
    }

    /// Prefetch every URL on background tasks and call `on_complete` once,
    /// after the last one finishes.
    pub fn spawn_prefetch_batch<F>(&self, urls: Vec<String>, on_complete: F)
    where
        F: FnOnce(PrefetchReport) + Send + 'static,
    {
        if urls.is_empty() {
            on_complete(PrefetchReport::default());
            return;
        }

        let countdown = Arc::new(BatchCountdown::new(urls.len(), Box::new(on_complete)));
        for url in urls {
            let cache = self.clone();
            let countdown = Arc::clone(&countdown);
            tokio::spawn(async move {
                let outcome = cache.prefetch_one(&url).await;
                countdown.finish_one(url, outcome);
            });
        }
    }

    async fn prefetch_one(&self, url: &str) -> Result<()> {
        let parsed = parse_url(url)?;
        let key = parsed.to_string();
        if self.store.has(&key).await {
            return Ok(());
        }
        self.download(parsed, key).await.map(|_| ()).inspect_err(|e| {
            debug!("prefetch of {} failed: {}", url, e);
        })
    }

    fn download(&self, url: Url, key: String) -> Flight<Bytes> {
        let client = self.client.clone();
        let store = Arc::clone(&self.store);
        let kind = self.kind;

        self.downloads.resolve(key.clone(), move || async move {
            // A download that settled just before this one started has
            // already written the cache.
            if let Some(bytes) = store.get(&key).await {
                return Ok(bytes);
            }

            debug!("downloading {}", key);
            let bytes = client
                .execute(&RequestDescriptor::download(url))
                .await
                .into_result()
                .inspect_err(|e| warn!("download of {} failed: {}", key, e))?;
            kind.validate(&key, &bytes)?;

            store.set(&key, bytes.clone()).await;
            Ok(bytes)
        })
    }
}

type Completion = Box<dyn FnOnce(PrefetchReport) + Send>;

/// Fires its completion exactly once, when the last task reports in
struct BatchCountdown {
    requested: usize,
    remaining: AtomicUsize,
    failed: Mutex<Vec<(String, EngageError)>>,
    on_complete: Mutex<Option<Completion>>,
}

impl BatchCountdown {
    fn new(requested: usize, on_complete: Completion) -> Self {
        Self {
            requested,
            remaining: AtomicUsize::new(requested),
            failed: Mutex::new(Vec::new()),
            on_complete: Mutex::new(Some(on_complete)),
        }
    }

    fn finish_one(&self, url: String, outcome: Result<()>) {
        if let Err(e) = outcome {
            self.failed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((url, e));
        }

        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        let failed = std::mem::take(&mut *self.failed.lock().unwrap_or_else(PoisonError::into_inner));
        let on_complete = self
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(on_complete) = on_complete {
            on_complete(PrefetchReport {
                requested: self.requested,
                failed,
            });
        }
    }
}
