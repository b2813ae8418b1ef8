//! Stub collaborators shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::models::{AccessToken, FlowSettings, OAuthClientConfig, UserProfile};
use crate::core::types::{
    AccountId, AuthCode, ClientId, ClientSecret, ProviderKey, RedirectUri, Scope,
};
use crate::provider::google::{GoogleClient, GoogleEndpoints};
use crate::provider::NetworkManager;

use super::error::Error;
use super::{
    pkce, AuthorizationParams, Message, NetworkRegistry, OAuthClient, Provisioning, Redirect,
    UserProvisioner,
};

pub const PROVIDER: &str = "social_auth_google";

pub fn settings() -> FlowSettings {
    FlowSettings::new(ProviderKey(PROVIDER.to_string()), "/user/login")
}

pub fn client_config(redirect_uri: &str) -> OAuthClientConfig {
    OAuthClientConfig::new(
        ClientId("client-id".to_string()),
        ClientSecret::new("client-secret".to_string()),
        RedirectUri(redirect_uri.to_string()),
        Scope::from_parts(vec!["email", "profile"]),
    )
}

pub fn google_registry(redirect_uri: &str) -> Arc<NetworkManager> {
    let client = GoogleClient::new(
        client_config(redirect_uri),
        GoogleEndpoints::default(),
        Duration::from_secs(5),
    )
    .unwrap();
    let mut registry = NetworkManager::default();
    registry.register(ProviderKey(PROVIDER.to_string()), Arc::new(client));
    Arc::new(registry)
}

#[derive(Clone)]
enum ProfileBehaviour {
    Found,
    Empty,
    Rejected,
}

pub struct StubClient {
    config: OAuthClientConfig,
    token: Option<String>,
    profile: ProfileBehaviour,
    pub codes: Arc<Mutex<Vec<AuthCode>>>,
    pub verifiers: Arc<Mutex<Vec<Option<pkce::Verifier>>>>,
}

impl StubClient {
    fn new(token: Option<&str>, profile: ProfileBehaviour) -> Self {
        Self {
            config: client_config("https://app/cb"),
            token: token.map(ToString::to_string),
            profile,
            codes: Arc::default(),
            verifiers: Arc::default(),
        }
    }

    pub fn succeeding(token: &str) -> Self {
        Self::new(Some(token), ProfileBehaviour::Found)
    }

    pub fn without_profile(token: &str) -> Self {
        Self::new(Some(token), ProfileBehaviour::Empty)
    }

    pub fn profile_rejected(token: &str) -> Self {
        Self::new(Some(token), ProfileBehaviour::Rejected)
    }

    pub fn failing_exchange() -> Self {
        Self::new(None, ProfileBehaviour::Found)
    }
}

#[async_trait]
impl OAuthClient for StubClient {
    fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    fn authorization_url(&self, _params: AuthorizationParams<'_>) -> Result<url::Url, Error> {
        url::Url::parse("https://provider.test/auth").map_err(|e| Error::Configuration(e.to_string()))
    }

    async fn exchange_code(
        &self,
        code: &AuthCode,
        verifier: Option<&pkce::Verifier>,
    ) -> Result<AccessToken, Error> {
        self.codes.lock().unwrap().push(code.clone());
        self.verifiers.lock().unwrap().push(verifier.cloned());
        self.token
            .as_ref()
            .map(|t| AccessToken::bearer(t.clone()).expires_in(Some(3600)))
            .ok_or_else(|| Error::Provider("invalid_grant".to_string()))
    }

    async fn fetch_profile(&self, _token: &AccessToken) -> Result<Option<UserProfile>, Error> {
        match self.profile {
            ProfileBehaviour::Found => Ok(Some(UserProfile {
                email: "a@b.com".to_string(),
                name: "A".to_string(),
                id: "42".to_string(),
                picture: "p.png".to_string(),
            })),
            ProfileBehaviour::Empty => Ok(None),
            ProfileBehaviour::Rejected => Err(Error::ProfileFetch("401".to_string())),
        }
    }
}

pub struct StubRegistry {
    client: Arc<dyn OAuthClient>,
}

impl StubRegistry {
    pub fn with(client: StubClient) -> Arc<Self> {
        Arc::new(Self {
            client: Arc::new(client),
        })
    }
}

impl NetworkRegistry for StubRegistry {
    fn get_sdk(&self, provider_key: &ProviderKey) -> Result<Arc<dyn OAuthClient>, Error> {
        if provider_key.0 == PROVIDER {
            Ok(self.client.clone())
        } else {
            Err(Error::Configuration(format!("unknown provider {}", provider_key)))
        }
    }
}

type Call = (String, String, String, String);

pub struct StubUsers {
    accept: bool,
    calls: Mutex<Vec<Call>>,
}

impl StubUsers {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            calls: Mutex::default(),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            calls: Mutex::default(),
        }
    }

    pub fn logged_in() -> Provisioning {
        Provisioning::LoggedIn {
            redirect: Redirect::to("/user/7"),
            account: AccountId("7".to_string()),
        }
    }

    pub fn rejected() -> Provisioning {
        Provisioning::Rejected {
            redirect: Redirect::to("/user/register"),
            message: Message::error("Registration is closed"),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserProvisioner for StubUsers {
    async fn authenticate_user(
        &self,
        email: &str,
        name: &str,
        external_id: &str,
        picture_url: &str,
    ) -> Provisioning {
        self.calls.lock().unwrap().push((
            email.to_string(),
            name.to_string(),
            external_id.to_string(),
            picture_url.to_string(),
        ));
        if self.accept {
            Self::logged_in()
        } else {
            Self::rejected()
        }
    }
}
