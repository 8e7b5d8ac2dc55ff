//! Identity and the wire resources it is derived from

use serde::{Deserialize, Serialize};
use url::Url;

use super::AccessToken;

/// Application document, the entry point to every other endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApplicationResource {
    pub client_id: Option<String>,
    pub name: Option<String>,
    /// Create (POST) and fetch (GET with bearer) the caller's profile
    pub profile_url: Url,
}

/// Profile as returned by the profile endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileResource {
    pub id: String,
    pub nickname: String,
    /// Canonical URL of this profile, target of nickname updates
    pub url: Url,
    #[serde(default)]
    pub memberships_url: Option<Url>,
    /// Only present when the profile was just created
    #[serde(default)]
    pub access_token: Option<String>,
}

impl ProfileResource {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id.clone(),
            nickname: self.nickname.clone(),
            profile_url: self.url.clone(),
            memberships_url: self.memberships_url.clone(),
        }
    }

    pub fn issued_token(&self) -> Option<AccessToken> {
        self.access_token
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(AccessToken::new)
    }
}

/// Resolved user record, valid only while its credential is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub nickname: String,
    pub profile_url: Url,
    pub memberships_url: Option<Url>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NicknameUpdate<'a> {
    pub nickname: &'a str,
}
