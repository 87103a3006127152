//! AWS SigV4 signing for API Gateway endpoints.
//!
//! This crate provides the signing collaborator used by reqgate clients:
//! a [`RequestSigner`] implementing Signature Version 4 for the
//! `execute-api` service, the AWS [`Credential`] type and the providers
//! that resolve it.
//!
//! ## Example
//!
//! ```no_run
//! use reqgate_aws_v4::{Config, DefaultCredentialProvider, RequestSigner};
//! use reqgate_core::{Context, OsEnv, SignedRequestFactory, Signer};
//! use std::sync::Arc;
//!
//! # fn example() -> reqgate_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let config = Config::default().from_env(&ctx);
//! let region = config.region.clone().unwrap_or_else(|| "us-east-1".to_string());
//!
//! let signer = Signer::new(
//!     ctx,
//!     DefaultCredentialProvider::with_config(Arc::new(config)),
//!     RequestSigner::execute_api(&region),
//! );
//! let factory = SignedRequestFactory::new(signer);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod constants;
pub use constants::EXECUTE_API;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
