#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Missing or malformed client configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Token exchange failed: network, SDK or provider rejection.
    #[error("provider error: {0}")]
    Provider(String),
    /// The provider would not tell us who the user is.
    #[error("profile fetch error: {0}")]
    ProfileFetch(String),
    #[error("invalid callback: {0}")]
    Callback(#[from] CallbackError),
    #[error("session error: {0}")]
    Session(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("provider returned {error:?}")]
    Denied {
        error: String,
        description: Option<String>,
    },
    #[error("no authorization code")]
    MissingCode,
    #[error("state parameter does not match")]
    StateMismatch,
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Session(e.to_string())
    }
}
