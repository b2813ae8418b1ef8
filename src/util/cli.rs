use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{event, Level};

use crate::auth::error::Error;
use crate::auth::{AuthorizationInitiator, CallbackHandler};
use crate::core::models::{FlowSettings, OAuthClientConfig};
use crate::core::types::{ClientId, ClientSecret, ProviderKey, RedirectUri, Scope};
use crate::http::server::{LoginService, Server};
use crate::provider::google::{GoogleClient, GoogleEndpoints};
use crate::provider::users::InMemoryUserManager;
use crate::provider::NetworkManager;
use crate::session::SessionRegistry;

#[derive(Parser, Debug)]
#[clap(
    name = "social-authd",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct Options {
    #[clap(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3030")]
    pub listen: SocketAddr,
    #[clap(long, env = "GOOGLE_CLIENT_ID")]
    pub client_id: String,
    #[clap(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: ClientSecret,
    #[clap(long, env = "GOOGLE_REDIRECT_URI")]
    pub redirect_uri: String,
    /// Space separated
    #[clap(long, env = "GOOGLE_SCOPES", default_value = "email profile")]
    pub scopes: String,
    #[clap(long, env = "PROVIDER_KEY", default_value = "social_auth_google")]
    pub provider_key: String,
    #[clap(long, env = "LOGIN_PATH", default_value = "/user/login")]
    pub login_path: String,
    #[clap(long, env = "POST_LOGIN_PATH", default_value = "/user")]
    pub post_login_path: String,
    #[clap(long, env = "OAUTH_CSRF_STATE", default_value = "true", parse(try_from_str))]
    pub csrf_state: bool,
    #[clap(long, env = "OAUTH_PKCE", default_value = "true", parse(try_from_str))]
    pub pkce: bool,
    #[clap(long, env = "ALLOW_REGISTRATION", default_value = "true", parse(try_from_str))]
    pub allow_registration: bool,
    /// Turn off only for plain-HTTP development
    #[clap(long, env = "SECURE_COOKIE", default_value = "true", parse(try_from_str))]
    pub secure_cookie: bool,
    /// Seconds
    #[clap(long, env = "HTTP_TIMEOUT", default_value = "10")]
    pub http_timeout: u64,
    /// Seconds of inactivity before a session is dropped
    #[clap(long, env = "SESSION_TTL", default_value = "3600")]
    pub session_ttl: u64,
    #[clap(long, env = "GOOGLE_AUTHORIZATION_ENDPOINT")]
    pub authorization_endpoint: Option<String>,
    #[clap(long, env = "GOOGLE_TOKEN_ENDPOINT")]
    pub token_endpoint: Option<String>,
    #[clap(long, env = "GOOGLE_USERINFO_ENDPOINT")]
    pub userinfo_endpoint: Option<String>,
}

impl Options {
    pub fn client_config(&self) -> OAuthClientConfig {
        OAuthClientConfig::new(
            ClientId(self.client_id.clone()),
            self.client_secret.clone(),
            RedirectUri(self.redirect_uri.clone()),
            Scope::from_delimited_parts(&self.scopes),
        )
    }

    pub fn endpoints(&self) -> GoogleEndpoints {
        let defaults = GoogleEndpoints::default();
        GoogleEndpoints {
            authorization: self
                .authorization_endpoint
                .clone()
                .unwrap_or(defaults.authorization),
            token: self.token_endpoint.clone().unwrap_or(defaults.token),
            userinfo: self.userinfo_endpoint.clone().unwrap_or(defaults.userinfo),
        }
    }

    pub fn flow_settings(&self) -> FlowSettings {
        let mut settings = FlowSettings::new(
            ProviderKey(self.provider_key.clone()),
            self.login_path.clone(),
        );
        settings.csrf_state = self.csrf_state;
        settings.pkce = self.pkce;
        settings
    }

    /// Wires the login service together. Fails on an unusable client
    /// configuration.
    pub fn build_service(&self) -> Result<LoginService, Error> {
        let config = self.client_config();
        config.validate()?;

        let settings = self.flow_settings();
        let client = GoogleClient::new(
            config,
            self.endpoints(),
            Duration::from_secs(self.http_timeout),
        )?;

        let mut networks = NetworkManager::default();
        networks.register(settings.provider_key.clone(), Arc::new(client));
        let networks = Arc::new(networks);

        let users = Arc::new(InMemoryUserManager::new(
            settings.provider_key.clone(),
            self.post_login_path.clone(),
            self.login_path.clone(),
            self.allow_registration,
        ));

        Ok(LoginService {
            initiator: AuthorizationInitiator::new(networks.clone(), settings.clone()),
            callback: CallbackHandler::new(networks, users, settings),
            sessions: SessionRegistry::new(Duration::from_secs(self.session_ttl)),
            secure_cookie: self.secure_cookie,
        })
    }
}

pub async fn run(opts: Options) -> Result<(), Error> {
    let service = opts.build_service()?;

    let sessions = service.sessions.clone();
    let every = Duration::from_secs((opts.session_ttl / 4).max(1));
    tokio::spawn(async move { sessions.start_clean_up_worker(every).await });

    event!(Level::INFO, listen = %opts.listen, "Serving Google login");
    Server::new(Arc::new(service)).serve(opts.listen).await;
    Ok(())
}
