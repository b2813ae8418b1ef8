use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{event, Level};
use url::Url;

use crate::auth::{error::Error, pkce, AuthorizationParams, OAuthClient};
use crate::core::models::{AccessToken, OAuthClientConfig, UserProfile};
use crate::core::types::{AuthCode, Scope};

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorization: String,
    pub token: String,
    pub userinfo: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            authorization: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            userinfo: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
        }
    }
}

/// Google OAuth 2.0 client for the authorization code flow.
#[derive(Debug)]
pub struct GoogleClient {
    config: OAuthClientConfig,
    endpoints: GoogleEndpoints,
    http: reqwest::Client,
}

impl GoogleClient {
    /// `timeout` bounds every request made to Google.
    pub fn new(
        config: OAuthClientConfig,
        endpoints: GoogleEndpoints,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build http client: {}", e)))?;

        Ok(Self {
            config,
            endpoints,
            http,
        })
    }
}

#[derive(serde::Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "bearer")]
    token_type: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    scope: Option<Scope>,
    id_token: Option<String>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(serde::Deserialize)]
struct UserInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

impl UserInfo {
    fn into_profile(self) -> Option<UserProfile> {
        if self.id.is_empty() || self.email.is_empty() {
            return None;
        }
        Some(UserProfile {
            email: self.email,
            name: self.name,
            id: self.id,
            picture: self.picture,
        })
    }
}

#[async_trait]
impl OAuthClient for GoogleClient {
    fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    fn authorization_url(&self, params: AuthorizationParams<'_>) -> Result<Url, Error> {
        let mut url = Url::parse(&self.endpoints.authorization)
            .map_err(|e| Error::Configuration(format!("bad authorization endpoint: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("access_type", "online")
                .append_pair("client_id", &self.config.client_id.0)
                .append_pair("redirect_uri", &self.config.redirect_uri.0)
                .append_pair("scope", &params.scope.as_joined());
            if let Some(state) = params.state {
                query.append_pair("state", &state.0);
            }
            if let Some(challenge) = params.pkce_challenge {
                query
                    .append_pair("code_challenge", &challenge.code)
                    .append_pair("code_challenge_method", challenge.method.as_str());
            }
        }

        Ok(url)
    }

    #[tracing::instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &AuthCode,
        verifier: Option<&pkce::Verifier>,
    ) -> Result<AccessToken, Error> {
        let request = TokenRequest {
            grant_type: "authorization_code",
            code: code.as_ref(),
            client_id: &self.config.client_id.0,
            client_secret: self.config.client_secret.expose(),
            redirect_uri: &self.config.redirect_uri.0,
            code_verifier: verifier.map(|v| v.value.as_str()),
        };
        let body = serde_urlencoded::to_string(&request)
            .map_err(|e| Error::Provider(format!("cannot encode token request: {}", e)))?;

        let response = self
            .http
            .post(&self.endpoints.token)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ErrorResponse>().await {
                Ok(ErrorResponse {
                    error,
                    error_description: Some(description),
                }) => format!("{}: {}", error, description),
                Ok(ErrorResponse { error, .. }) => error,
                Err(_) => String::from("unreadable error body"),
            };
            event!(Level::WARN, %status, %reason, "Token endpoint refused the code");
            return Err(Error::Provider(format!("token endpoint returned {} ({})", status, reason)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("bad token response: {}", e)))?;

        if token.access_token.is_empty() {
            return Err(Error::Provider("token response without access_token".to_string()));
        }

        event!(Level::DEBUG, expires_in = ?token.expires_in, "Exchanged authorization code");
        let mut access_token = AccessToken::bearer(token.access_token).expires_in(token.expires_in);
        access_token.token_type = token.token_type;
        access_token.refresh_token = token.refresh_token;
        access_token.scope = token.scope;
        access_token.id_token = token.id_token;
        Ok(access_token)
    }

    #[tracing::instrument(skip_all)]
    async fn fetch_profile(&self, token: &AccessToken) -> Result<Option<UserProfile>, Error> {
        let response = self
            .http
            .get(&self.endpoints.userinfo)
            .bearer_auth(token.secret())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::ProfileFetch(format!("userinfo request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ProfileFetch(format!("userinfo endpoint returned {}", status)));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| Error::ProfileFetch(format!("bad userinfo response: {}", e)))?;

        Ok(info.into_profile())
    }
}
