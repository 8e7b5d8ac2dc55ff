//! Session resolution
//!
//! Resolves the caller's access token and profile exactly once per session,
//! no matter how many tasks ask at the same time, and regenerates the token
//! when the server rejects a persisted one.
//!
//! ```text
//! Idle ──► NoCredential ──► (create profile) ──► Valid
//! Idle ──► Validating ──────────────────────────► Valid
//!              └── 401/403 ──► Invalid ──► (create profile) ──► Valid
//! Valid ── invalidate() ──► Invalid ──► Validating ──► ...
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use super::profile::NicknameUpdate;
use super::{
    AccessToken, ApplicationResource, CredentialStore, ErrorReporter, Identity, ProfileResource,
    SetupError,
};
use crate::config::SessionConfig;
use crate::network::{NetworkClient, RequestDescriptor};
use crate::sync::{AsyncValue, ObserverRegistry};
use crate::utils::{EngageError, NetworkError, Result, SessionError};

/// Credential validity as seen by this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No resolution attempted yet
    Idle,
    /// Nothing persisted; a profile is being created
    NoCredential,
    /// A persisted token is being probed
    Validating,
    /// Token confirmed this session
    Valid,
    /// Token rejected or explicitly invalidated
    Invalid,
}

/// Receives nickname changes made through [`SessionResolver::set_nickname`]
pub trait NicknameObserver: Send + Sync {
    fn nickname_did_change(&self, nickname: &str);
}

#[derive(Debug, Clone)]
struct Session {
    token: AccessToken,
    identity: Identity,
}

struct SessionInner {
    client: NetworkClient,
    config: SessionConfig,
    store: Arc<dyn CredentialStore>,
    reporter: Arc<dyn ErrorReporter>,
    application: AsyncValue<ApplicationResource>,
    session: AsyncValue<Session>,
    nickname: AsyncValue<String>,
    nickname_observers: ObserverRegistry<dyn NicknameObserver>,
    status: Mutex<Status>,
}

/// Current state plus the invalidation count it belongs to
struct Status {
    state: SessionState,
    epoch: u64,
}

/// Resolves and caches the session credential and identity
///
/// Cloning is cheap; clones share one session.
#[derive(Clone)]
pub struct SessionResolver {
    inner: Arc<SessionInner>,
}

impl SessionResolver {
    pub fn new(
        client: NetworkClient,
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                client,
                config,
                store,
                reporter,
                application: AsyncValue::new(),
                session: AsyncValue::new(),
                nickname: AsyncValue::new(),
                nickname_observers: ObserverRegistry::new(),
                status: Mutex::new(Status {
                    state: SessionState::Idle,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Current state. An establishment overtaken by [`invalidate`](Self::invalidate)
    /// leaves it at `Invalid`.
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Validated access token, creating or regenerating one if needed
    pub async fn access_token(&self) -> Result<AccessToken> {
        Ok(self.session().await?.token)
    }

    pub async fn identity(&self) -> Result<Identity> {
        let mut identity = self.session().await?.identity;
        if let Some(nickname) = self.inner.nickname.peek() {
            identity.nickname = nickname;
        }
        Ok(identity)
    }

    pub async fn user_id(&self) -> Result<String> {
        Ok(self.session().await?.identity.user_id)
    }

    pub async fn nickname(&self) -> Result<String> {
        let resolver = self.clone();
        self.inner
            .nickname
            .get_or_resolve(move || async move {
                Ok(resolver.session().await?.identity.nickname)
            })
            .await
    }

    /// Change the nickname remotely, then locally, then tell observers.
    ///
    /// On any failure the cached nickname is untouched and no observer runs.
    /// If the session was replaced while the update was in flight, the
    /// update belonged to the old credential and local state is left alone.
    pub async fn set_nickname(&self, nickname: &str) -> Result<()> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(SessionError::InvalidNickname(nickname.to_string()).into());
        }

        let session = self.session().await?;
        let request = RequestDescriptor::<ProfileResource>::patch(
            session.identity.profile_url.clone(),
        )
        .bearer(&session.token)
        .json_body(&NicknameUpdate { nickname })?;

        if let Err(e) = self.inner.client.execute(&request).await.into_result() {
            warn!("nickname update for {} failed: {}", session.identity.user_id, e);
            return Err(e.into());
        }

        let nickname = nickname.to_string();
        let current = self.inner.session.update(|cached| {
            if cached.token != session.token {
                return false;
            }
            cached.identity.nickname = nickname.clone();
            true
        });
        if !current {
            debug!("session replaced during nickname update, keeping cached state");
            return Ok(());
        }
        self.inner.nickname.set(nickname.clone());

        info!("nickname changed to {:?}", nickname);
        self.inner
            .nickname_observers
            .publish(|observer| observer.nickname_did_change(&nickname));
        Ok(())
    }

    pub fn add_nickname_observer(&self, observer: &Arc<dyn NicknameObserver>) {
        self.inner.nickname_observers.add(observer);
    }

    pub fn remove_nickname_observer(&self, observer: &Arc<dyn NicknameObserver>) {
        self.inner.nickname_observers.remove(observer);
    }

    /// Drop the cached session; the next call re-validates the stored token
    pub fn invalidate(&self) {
        {
            let mut status = self.inner.status();
            status.epoch += 1;
            status.state = SessionState::Invalid;
        }
        self.inner.session.reset();
        self.inner.nickname.reset();
        debug!("session invalidated");
    }

    async fn session(&self) -> Result<Session> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .session
            .get_or_resolve(move || inner.establish())
            .await
    }
}

impl SessionInner {
    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> SessionState {
        self.status().state
    }

    /// Move to `state` unless the session was invalidated since `epoch`
    fn transition(&self, epoch: u64, state: SessionState) -> bool {
        let mut status = self.status();
        if status.epoch != epoch {
            return false;
        }
        status.state = state;
        true
    }

    async fn establish(self: Arc<Self>) -> Result<Session> {
        let (previous, epoch) = {
            let status = self.status();
            (status.state, status.epoch)
        };
        match self.clone().try_establish(epoch).await {
            Ok(session) => {
                if self.transition(epoch, SessionState::Valid) {
                    self.nickname.set(session.identity.nickname.clone());
                } else {
                    debug!("session invalidated while it was being established");
                }
                Ok(session)
            }
            Err(e) => {
                self.transition(epoch, previous);
                self.reporter.report(&SetupError::Unknown(e.clone()));
                Err(e)
            }
        }
    }

    async fn try_establish(self: Arc<Self>, epoch: u64) -> Result<Session> {
        let application = self.application().await?;

        let Some(token) = self.store.load().await? else {
            self.transition(epoch, SessionState::NoCredential);
            return self.create_profile(&application).await;
        };

        self.transition(epoch, SessionState::Validating);
        match self.fetch_profile(&application, &token).await {
            Ok(profile) => {
                debug!("stored access token validated for {}", profile.id);
                Ok(Session {
                    token,
                    identity: profile.identity(),
                })
            }
            Err(EngageError::Network(e)) if e.is_auth_rejection() => {
                warn!("stored access token rejected ({}), creating a new profile", e);
                self.transition(epoch, SessionState::Invalid);
                self.reporter.report(&SetupError::InvalidCredential);
                self.create_profile(&application).await
            }
            Err(e) => Err(e),
        }
    }

    async fn application(self: &Arc<Self>) -> Result<ApplicationResource> {
        let client = self.client.clone();
        let url = self.config.application_url()?;
        self.application
            .get_or_resolve(move || async move {
                let request = RequestDescriptor::<ApplicationResource>::get(url);
                Ok(client.execute(&request).await.into_result()?)
            })
            .await
    }

    async fn fetch_profile(
        &self,
        application: &ApplicationResource,
        token: &AccessToken,
    ) -> Result<ProfileResource> {
        let request =
            RequestDescriptor::<ProfileResource>::get(application.profile_url.clone()).bearer(token);
        Ok(self.client.execute(&request).await.into_result()?)
    }

    async fn create_profile(&self, application: &ApplicationResource) -> Result<Session> {
        let request = RequestDescriptor::<ProfileResource>::post(application.profile_url.clone())
            .json_body(&serde_json::json!({}))?;
        let profile = self.client.execute(&request).await.into_result()?;

        let token = profile.issued_token().ok_or_else(|| {
            NetworkError::MalformedResponse("created profile carries no access token".into())
        })?;
        self.store.store(&token).await?;

        info!("created profile {}", profile.id);
        Ok(Session {
            token,
            identity: profile.identity(),
        })
    }
}
