use crate::{Context, Error, ProvideCredential, Result, SignRequest, SignedRequest, SigningCredential};
use log::debug;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

/// Signer couples a credential provider with a signing algorithm.
///
/// The loaded credential is cached and reused until it reports itself invalid.
#[derive(Clone)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential> Debug for Signer<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("ctx", &self.ctx)
            .field("provider", &self.provider)
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        provider: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            provider: Arc::new(provider),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the credential provider, dropping any cached credential.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = K>,
    ) -> Self {
        self.provider = Arc::new(provider);
        self.credential = Arc::new(Mutex::new(None));
        self
    }

    /// Context credentials are resolved from.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Sign the request in place.
    pub fn sign(&self, req: &mut SignedRequest) -> Result<()> {
        let cached = self.credential.lock().expect("lock poisoned").clone();
        let credential = if cached.is_valid() {
            cached
        } else {
            debug!("cached credential is absent or invalid, loading a new one");
            let loaded = self.provider.provide_credential(&self.ctx)?;
            *self.credential.lock().expect("lock poisoned") = loaded.clone();
            loaded
        };

        let Some(credential) = credential else {
            return Err(Error::credential_invalid(
                "no credential available to sign the request",
            ));
        };

        self.builder.sign_request(&self.ctx, req, &credential)
    }
}
