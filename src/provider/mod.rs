use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::{error::Error, NetworkRegistry, OAuthClient};
use crate::core::types::ProviderKey;

pub mod google;
pub mod users;

/// Configured provider clients, keyed by provider key. Filled once at
/// startup.
#[derive(Default)]
pub struct NetworkManager {
    instances: HashMap<ProviderKey, Arc<dyn OAuthClient>>,
}

impl std::fmt::Debug for NetworkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.instances.keys()).finish()
    }
}

impl NetworkManager {
    pub fn register(&mut self, key: ProviderKey, client: Arc<dyn OAuthClient>) {
        self.instances.insert(key, client);
    }
}

impl NetworkRegistry for NetworkManager {
    fn get_sdk(&self, provider_key: &ProviderKey) -> Result<Arc<dyn OAuthClient>, Error> {
        self.instances
            .get(provider_key)
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("no client registered for {}", provider_key)))
    }
}
