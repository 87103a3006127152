use crate::provide_credential::{
    ConfigCredentialProvider, EnvCredentialProvider, ProvideCredentialChain,
};
use crate::{Config, Credential};
use reqgate_core::{Context, ProvideCredential, Result};
use std::sync::Arc;

/// DefaultCredentialProvider is a loader that will try to load credential via default chains.
///
/// Resolution order:
///
/// 1. Keys set on the [`Config`], if one was given
/// 2. Environment variables
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` reading the environment.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new().push(EnvCredentialProvider::new());
        Self { chain }
    }

    /// Create a provider preferring the keys carried by `config`.
    pub fn with_config(config: Arc<Config>) -> Self {
        let chain = ProvideCredentialChain::new()
            .push(ConfigCredentialProvider::new(config))
            .push(EnvCredentialProvider::new());
        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain) -> Self {
        Self { chain }
    }
}

impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx)
    }
}
