use std::sync::Arc;

use tracing::{event, Level};

use crate::core::models::{AccessToken, FlowSettings, UserProfile};
use crate::core::types::{AuthCode, CsrfState};

use super::error::{CallbackError, Error};
use super::{
    get_json, pkce, put_json, AuthResult, Failure, Message, NetworkRegistry, OAuthClient,
    Provisioning, Redirect, SessionStore, UserProvisioner,
};

pub const AUTHENTICATION_FAILED: &str =
    "You could not be authenticated, please contact the administrator";

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<AuthCode>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Never fails: unknown keys are ignored and empty values count as
    /// absent.
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "code" => params.code = Some(AuthCode(value)),
                "state" => params.state = Some(value),
                "error" => params.error = Some(value),
                "error_description" => params.error_description = Some(value),
                _ => {}
            }
        }
        params
    }

    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(AuthCode(code.into())),
            ..Default::default()
        }
    }
}

/// States of one callback invocation. The failed terminal state is
/// `AuthResult::Failed`, which records the stage it was reached from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    TokenExchanged,
    ProfileFetched,
}

/// Turns the provider's answer into a logged-in user, or into a redirect to
/// the login page.
pub struct CallbackHandler {
    registry: Arc<dyn NetworkRegistry>,
    users: Arc<dyn UserProvisioner>,
    settings: FlowSettings,
}

impl CallbackHandler {
    pub fn new(
        registry: Arc<dyn NetworkRegistry>,
        users: Arc<dyn UserProvisioner>,
        settings: FlowSettings,
    ) -> Self {
        Self {
            registry,
            users,
            settings,
        }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    #[tracing::instrument(skip_all, fields(provider = %self.settings.provider_key))]
    pub async fn handle_callback(
        &self,
        session: &mut dyn SessionStore,
        params: CallbackParams,
    ) -> AuthResult {
        let token_key = self.settings.access_token_key();

        match self.authenticate(session, params).await {
            Ok(profile) => {
                event!(
                    Level::DEBUG,
                    stage = ?Stage::ProfileFetched,
                    external_id = %profile.id,
                    "Provider identified user"
                );
                let provisioning = self
                    .users
                    .authenticate_user(&profile.email, &profile.name, &profile.id, &profile.picture)
                    .await;
                if let Provisioning::Rejected { .. } = &provisioning {
                    event!(Level::INFO, "User provisioner rejected the identity");
                    session.remove(&token_key);
                }
                AuthResult::Provisioned(provisioning)
            }
            Err((stage, error)) => {
                event!(Level::WARN, ?stage, %error, "Authentication failed");
                // Only a token written by this callback is dropped.
                if stage == Stage::TokenExchanged {
                    session.remove(&token_key);
                }
                AuthResult::Failed(Failure {
                    stage,
                    error,
                    redirect: Redirect::to(self.settings.login_path.clone()),
                    message: Message::error(AUTHENTICATION_FAILED),
                })
            }
        }
    }

    async fn authenticate(
        &self,
        session: &mut dyn SessionStore,
        params: CallbackParams,
    ) -> Result<UserProfile, (Stage, Error)> {
        let pending = |e: Error| (Stage::Pending, e);

        let expected_state: Option<CsrfState> = get_json(session, &self.settings.state_key());
        let verifier: Option<pkce::Verifier> = get_json(session, &self.settings.pkce_verifier_key());
        session.remove(&self.settings.state_key());
        session.remove(&self.settings.pkce_verifier_key());

        if let Some(error) = params.error {
            return Err(pending(
                CallbackError::Denied {
                    error,
                    description: params.error_description,
                }
                .into(),
            ));
        }

        let code = params
            .code
            .ok_or_else(|| pending(CallbackError::MissingCode.into()))?;

        if self.settings.csrf_state {
            match (expected_state, params.state) {
                (Some(expected), Some(actual)) if expected.0 == actual => {}
                _ => return Err(pending(CallbackError::StateMismatch.into())),
            }
        }

        let client = self.registry.get_sdk(&self.settings.provider_key).map_err(pending)?;

        let token = client
            .exchange_code(&code, verifier.as_ref())
            .await
            .map_err(pending)?;

        // Other components may call the provider API for the rest of the
        // session with this token.
        put_json(session, &self.settings.access_token_key(), &token).map_err(pending)?;
        event!(Level::DEBUG, "Access token stored in session");

        self.fetch_profile(client.as_ref(), &token)
            .await
            .map_err(|e| (Stage::TokenExchanged, e))
    }

    async fn fetch_profile(
        &self,
        client: &dyn OAuthClient,
        token: &AccessToken,
    ) -> Result<UserProfile, Error> {
        client
            .fetch_profile(token)
            .await?
            .ok_or_else(|| Error::ProfileFetch("provider returned no user".to_string()))
    }
}

/// Access token stored by a successful callback, if it is still valid.
pub fn stored_access_token(
    session: &dyn SessionStore,
    settings: &FlowSettings,
) -> Option<AccessToken> {
    get_json::<AccessToken>(session, &settings.access_token_key()).filter(|t| !t.is_expired())
}
