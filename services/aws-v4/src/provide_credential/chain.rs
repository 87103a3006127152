use crate::Credential;
use log::{debug, warn};
use reqgate_core::{Context, ProvideCredential, Result};
use std::fmt::{self, Debug};

/// A chain of credential providers that will be tried in order.
///
/// The first provider returning a credential wins. Providers that fail are
/// logged and skipped.
pub struct ProvideCredentialChain {
    providers: Vec<Box<dyn ProvideCredential<Credential = Credential>>>,
}

impl ProvideCredentialChain {
    /// Create a new empty credential provider chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a credential provider to the chain.
    pub fn push(mut self, provider: impl ProvideCredential<Credential = Credential>) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProvideCredentialChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ProvideCredentialChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers", &self.providers)
            .finish()
    }
}

impl ProvideCredential for ProvideCredentialChain {
    type Credential = Credential;

    fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        for provider in &self.providers {
            debug!("trying credential provider: {provider:?}");

            match provider.provide_credential(ctx) {
                Ok(Some(cred)) => {
                    debug!("loaded credential from provider: {provider:?}");
                    return Ok(Some(cred));
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!("failed to load credential from provider {provider:?}: {e}");
                    continue;
                }
            }
        }

        Ok(None)
    }
}
