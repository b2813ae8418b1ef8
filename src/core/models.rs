use std::fmt;

use crate::auth::error::Error;

use super::types::*;

/// Credentials and scopes of one registered OAuth client. Loaded once at
/// startup.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub redirect_uri: RedirectUri,
    pub scope: Scope,
}

impl OAuthClientConfig {
    pub fn new(
        client_id: ClientId,
        client_secret: ClientSecret,
        redirect_uri: RedirectUri,
        scope: Scope,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            scope,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.client_id.0.trim().is_empty() {
            return Err(Error::Configuration("client id is missing".to_string()));
        }
        if self.client_secret.expose().trim().is_empty() {
            return Err(Error::Configuration("client secret is missing".to_string()));
        }
        if self.redirect_uri.0.trim().is_empty() {
            return Err(Error::Configuration("redirect uri is missing".to_string()));
        }
        url::Url::parse(&self.redirect_uri.0).map_err(|e| {
            Error::Configuration(format!(
                "redirect uri {:?} is not an absolute url: {}",
                self.redirect_uri.0, e
            ))
        })?;
        if self.scope.is_empty() {
            return Err(Error::Configuration("no scope requested".to_string()));
        }
        Ok(())
    }
}

/// Where a login flow for one provider keeps its session entries and where
/// it sends the browser when authentication fails.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub provider_key: ProviderKey,
    pub login_path: String,
    pub csrf_state: bool,
    pub pkce: bool,
}

impl FlowSettings {
    pub fn new(provider_key: ProviderKey, login_path: impl Into<String>) -> Self {
        Self {
            provider_key,
            login_path: login_path.into(),
            csrf_state: true,
            pkce: true,
        }
    }

    pub fn access_token_key(&self) -> String {
        format!("{}_access_token", self.provider_key)
    }

    pub fn state_key(&self) -> String {
        format!("{}_oauth_state", self.provider_key)
    }

    pub fn pkce_verifier_key(&self) -> String {
        format!("{}_pkce_verifier", self.provider_key)
    }
}

/// Access token issued by the provider. Lives in the browser session only.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Unix timestamp (seconds) after which the token is no longer valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl AccessToken {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
            refresh_token: None,
            scope: None,
            id_token: None,
        }
    }

    pub fn expires_in(mut self, secs: Option<u64>) -> Self {
        self.expires_at = secs.map(|s| current_timestamp().saturating_add(s));
        self
    }

    pub fn secret(&self) -> &str {
        &self.access_token
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => current_timestamp() >= at,
            None => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Identity attributes of the authenticated user, as reported by the
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub id: String,
    pub picture: String,
}
