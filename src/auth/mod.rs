use std::sync::Arc;

use async_trait::async_trait;

use crate::core::models::{AccessToken, OAuthClientConfig, UserProfile};
use crate::core::types::{AccountId, AuthCode, CsrfState, ProviderKey, Scope};

pub mod authorization;
pub mod callback;
pub mod error;
pub mod pkce;

#[cfg(test)]
pub(crate) mod testing;

pub use authorization::{AuthorizationInitiator, AuthorizationRequest};
pub use callback::{stored_access_token, CallbackHandler, CallbackParams, Stage};
use error::Error;

/// What goes into the provider's authorization URL besides the client
/// configuration.
#[derive(Debug, Clone)]
pub struct AuthorizationParams<'a> {
    pub scope: &'a Scope,
    pub state: Option<&'a CsrfState>,
    pub pkce_challenge: Option<&'a pkce::Challenge>,
}

/// Capability set of a provider SDK.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    fn config(&self) -> &OAuthClientConfig;

    fn authorization_url(&self, params: AuthorizationParams<'_>) -> Result<url::Url, Error>;

    async fn exchange_code(
        &self,
        code: &AuthCode,
        verifier: Option<&pkce::Verifier>,
    ) -> Result<AccessToken, Error>;

    /// `Ok(None)` when the provider answered but did not identify a user.
    async fn fetch_profile(&self, token: &AccessToken) -> Result<Option<UserProfile>, Error>;
}

pub trait NetworkRegistry: Send + Sync {
    fn get_sdk(&self, provider_key: &ProviderKey) -> Result<Arc<dyn OAuthClient>, Error>;
}

/// Logs in or registers the local user behind an external identity.
#[async_trait]
pub trait UserProvisioner: Send + Sync {
    async fn authenticate_user(
        &self,
        email: &str,
        name: &str,
        external_id: &str,
        picture_url: &str,
    ) -> Provisioning;
}

/// Key-value store scoped to one browser session.
pub trait SessionStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str) -> Option<String>;
}

pub fn put_json<T: serde::Serialize>(
    session: &mut dyn SessionStore,
    key: &str,
    value: &T,
) -> Result<(), Error> {
    let encoded = serde_json::to_string(value)?;
    session.set(key, encoded);
    Ok(())
}

pub fn get_json<T: serde::de::DeserializeOwned>(
    session: &dyn SessionStore,
    key: &str,
) -> Option<T> {
    session
        .get(key)
        .and_then(|raw| serde_json::from_str(&raw).ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Status,
    Error,
}

/// Message shown to the user on the next page they load.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Status,
            text: text.into(),
        }
    }
}

/// Outcome reported by the user provisioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioning {
    LoggedIn {
        redirect: Redirect,
        account: AccountId,
    },
    Rejected {
        redirect: Redirect,
        message: Message,
    },
}

impl Provisioning {
    pub fn redirect(&self) -> &Redirect {
        match self {
            Self::LoggedIn { redirect, .. } | Self::Rejected { redirect, .. } => redirect,
        }
    }
}

#[derive(Debug)]
pub struct Failure {
    /// Last state reached before the flow failed.
    pub stage: Stage,
    pub error: Error,
    pub redirect: Redirect,
    pub message: Message,
}

#[derive(Debug)]
pub enum AuthResult {
    /// Whatever the provisioner returned, untouched.
    Provisioned(Provisioning),
    Failed(Failure),
}

impl AuthResult {
    pub fn redirect(&self) -> &Redirect {
        match self {
            Self::Provisioned(p) => p.redirect(),
            Self::Failed(f) => &f.redirect,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
