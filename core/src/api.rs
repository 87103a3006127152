use crate::{Context, Result, SignedRequest};
use std::fmt::Debug;

/// SigningCredential is the trait used by signer as the signing credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is still usable.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential resolves the credential used to sign requests.
///
/// Services require different credentials: AWS needs an access key pair,
/// other gateways may need a token.
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load credential from current env.
    ///
    /// Returns `Ok(None)` if this provider has nothing to offer.
    fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the signing algorithm applied to a canonical request.
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// Implementations add whatever headers or query parameters their scheme
    /// requires and may read the buffered content to hash it.
    fn sign_request(
        &self,
        ctx: &Context,
        req: &mut SignedRequest,
        credential: &Self::Credential,
    ) -> Result<()>;
}
