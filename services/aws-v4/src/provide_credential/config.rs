use crate::{Config, Credential};
use reqgate_core::{Context, ProvideCredential, Result};
use std::sync::Arc;

/// ConfigCredentialProvider hands out the keys carried by a [`Config`].
#[derive(Debug)]
pub struct ConfigCredentialProvider {
    config: Arc<Config>,
}

impl ConfigCredentialProvider {
    /// Create a new `ConfigCredentialProvider` instance.
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl ProvideCredential for ConfigCredentialProvider {
    type Credential = Credential;

    fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        let (Some(ak), Some(sk)) = (&self.config.access_key_id, &self.config.secret_access_key)
        else {
            return Ok(None);
        };

        Ok(Some(Credential {
            access_key_id: ak.clone(),
            secret_access_key: sk.clone(),
            session_token: self.config.session_token.clone(),
            expires_in: None,
        }))
    }
}
