use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{event, Level};

use crate::auth::{Message, Provisioning, Redirect, UserProvisioner};
use crate::core::types::{AccountId, ProviderKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: String,
    pub external_id: String,
    pub picture: String,
}

/// Login-or-register keyed by email, kept in process memory.
#[derive(Debug)]
pub struct InMemoryUserManager {
    plugin_id: ProviderKey,
    post_login_path: String,
    login_path: String,
    allow_registration: bool,
    accounts: Mutex<HashMap<String, Account>>,
}

impl InMemoryUserManager {
    pub fn new(
        plugin_id: ProviderKey,
        post_login_path: impl Into<String>,
        login_path: impl Into<String>,
        allow_registration: bool,
    ) -> Self {
        Self {
            plugin_id,
            post_login_path: post_login_path.into(),
            login_path: login_path.into(),
            allow_registration,
            accounts: Mutex::default(),
        }
    }

    pub fn account(&self, email: &str) -> Option<Account> {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.get(&email.to_lowercase()).cloned()
    }

    fn reject(&self, text: &str) -> Provisioning {
        Provisioning::Rejected {
            redirect: Redirect::to(self.login_path.clone()),
            message: Message::error(text),
        }
    }
}

#[async_trait]
impl UserProvisioner for InMemoryUserManager {
    #[tracing::instrument(skip_all, fields(plugin_id = %self.plugin_id))]
    async fn authenticate_user(
        &self,
        email: &str,
        name: &str,
        external_id: &str,
        picture_url: &str,
    ) -> Provisioning {
        if email.trim().is_empty() {
            return self.reject("The provider did not share an email address.");
        }

        let key = email.to_lowercase();
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let next_id = accounts.len() + 1;

        let account = match accounts.get_mut(&key) {
            Some(existing) => {
                if !existing.external_id.is_empty() && existing.external_id != external_id {
                    event!(Level::WARN, "Email already linked to a different external account");
                    return self.reject("This email address is linked to another account.");
                }
                existing.name = name.to_string();
                existing.picture = picture_url.to_string();
                existing.external_id = external_id.to_string();
                existing.clone()
            }
            None if self.allow_registration => {
                let account = Account {
                    id: AccountId(next_id.to_string()),
                    email: email.to_string(),
                    name: name.to_string(),
                    external_id: external_id.to_string(),
                    picture: picture_url.to_string(),
                };
                event!(Level::INFO, account = %account.id.0, "Registered new account");
                accounts.insert(key, account.clone());
                account
            }
            None => {
                return self.reject("Registration of new accounts is disabled.");
            }
        };

        event!(Level::DEBUG, account = %account.id.0, "Logged in");
        Provisioning::LoggedIn {
            redirect: Redirect::to(self.post_login_path.clone()),
            account: account.id,
        }
    }
}
