use std::sync::Arc;

use tracing::{event, Level};

use crate::core::models::FlowSettings;
use crate::core::types::CsrfState;
use crate::util::random::FromRandom;

use super::error::Error;
use super::{pkce, put_json, AuthorizationParams, NetworkRegistry, Redirect, SessionStore};

/// Provider URL together with the values the callback needs to check the
/// answer against.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: url::Url,
    pub state: Option<CsrfState>,
    pub pkce_verifier: Option<pkce::Verifier>,
}

/// Sends the browser to the provider's consent page.
pub struct AuthorizationInitiator {
    registry: Arc<dyn NetworkRegistry>,
    settings: FlowSettings,
}

impl AuthorizationInitiator {
    pub fn new(registry: Arc<dyn NetworkRegistry>, settings: FlowSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Builds the request without touching the session.
    pub fn prepare_authorization(&self) -> Result<AuthorizationRequest, Error> {
        let client = self.registry.get_sdk(&self.settings.provider_key)?;
        let config = client.config();
        config.validate()?;

        let state = if self.settings.csrf_state {
            Some(CsrfState::from_random())
        } else {
            None
        };
        let pkce_verifier = if self.settings.pkce {
            Some(pkce::Verifier::from_random())
        } else {
            None
        };
        let challenge = pkce_verifier.as_ref().map(pkce::Verifier::challenge);

        let url = client.authorization_url(AuthorizationParams {
            scope: &config.scope,
            state: state.as_ref(),
            pkce_challenge: challenge.as_ref(),
        })?;

        event!(
            Level::DEBUG,
            client_id = ?config.client_id,
            scope = %config.scope,
            "Prepared authorization request"
        );

        Ok(AuthorizationRequest {
            url,
            state,
            pkce_verifier,
        })
    }

    #[tracing::instrument(skip_all, fields(provider = %self.settings.provider_key))]
    pub fn begin_authorization(&self, session: &mut dyn SessionStore) -> Result<Redirect, Error> {
        let request = self.prepare_authorization()?;

        if let Some(state) = &request.state {
            put_json(session, &self.settings.state_key(), state)?;
        }
        if let Some(verifier) = &request.pkce_verifier {
            put_json(session, &self.settings.pkce_verifier_key(), verifier)?;
        }

        Ok(Redirect::to(request.url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{google_registry, settings};
    use crate::auth::get_json;
    use crate::core::types::ProviderKey;
    use crate::session::MemorySession;

    use std::collections::HashMap;

    fn query(redirect: &Redirect) -> HashMap<String, String> {
        url::Url::parse(&redirect.location)
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect()
    }

    #[test]
    fn url_carries_scopes_and_redirect_uri() {
        let initiator = AuthorizationInitiator::new(google_registry("https://app/cb"), settings());
        let mut session = MemorySession::default();

        let redirect = initiator.begin_authorization(&mut session).unwrap();
        let params = query(&redirect);

        assert!(redirect
            .location
            .starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(params["scope"], "email profile");
        assert_eq!(params["redirect_uri"], "https://app/cb");
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(params["response_type"], "code");
    }

    #[test]
    fn url_never_contains_the_secret() {
        let initiator = AuthorizationInitiator::new(google_registry("https://app/cb"), settings());
        let mut session = MemorySession::default();

        let redirect = initiator.begin_authorization(&mut session).unwrap();

        assert!(!redirect.location.contains("client-secret"));
        assert!(!query(&redirect).contains_key("client_secret"));
    }

    #[test]
    fn state_and_verifier_are_kept_in_session() {
        let settings = settings();
        let initiator = AuthorizationInitiator::new(google_registry("https://app/cb"), settings.clone());
        let mut session = MemorySession::default();

        let redirect = initiator.begin_authorization(&mut session).unwrap();
        let params = query(&redirect);

        let state: CsrfState = get_json(&session, &settings.state_key()).unwrap();
        assert_eq!(params["state"], state.0);

        let verifier: pkce::Verifier = get_json(&session, &settings.pkce_verifier_key()).unwrap();
        assert_eq!(params["code_challenge"], verifier.challenge().code);
        assert_eq!(params["code_challenge_method"], "S256");
    }

    #[test]
    fn prepared_request_matches_its_url() {
        let initiator = AuthorizationInitiator::new(google_registry("https://app/cb"), settings());

        let request = initiator.prepare_authorization().unwrap();
        let params: HashMap<String, String> = request.url.query_pairs().into_owned().collect();

        assert_eq!(params["state"], request.state.unwrap().0);
        assert_eq!(
            params["code_challenge"],
            request.pkce_verifier.unwrap().challenge().code
        );
    }

    #[test]
    fn hardening_can_be_switched_off() {
        let mut settings = settings();
        settings.csrf_state = false;
        settings.pkce = false;
        let initiator = AuthorizationInitiator::new(google_registry("https://app/cb"), settings);
        let mut session = MemorySession::default();

        let redirect = initiator.begin_authorization(&mut session).unwrap();
        let params = query(&redirect);

        assert!(!params.contains_key("state"));
        assert!(!params.contains_key("code_challenge"));
        assert!(session.is_empty());
    }

    #[test]
    fn unknown_provider_is_a_configuration_error() {
        let mut settings = settings();
        settings.provider_key = ProviderKey("nope".to_string());
        let initiator = AuthorizationInitiator::new(google_registry("https://app/cb"), settings);
        let mut session = MemorySession::default();

        let result = initiator.begin_authorization(&mut session);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn missing_redirect_uri_is_a_configuration_error() {
        let initiator = AuthorizationInitiator::new(google_registry(""), settings());
        let mut session = MemorySession::default();

        let result = initiator.begin_authorization(&mut session);
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(session.is_empty());
    }
}
