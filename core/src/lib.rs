//! Core components for invoking signed API endpoints.
//!
//! This crate provides the data model, the signing contracts and the two
//! invocation paths shared by every reqgate transport and signer.
//!
//! ## Overview
//!
//! - **ApiRequest**: an immutable request description built through [`ApiRequestBuilder`]
//! - **SignedRequestFactory**: buffers the payload, adds computed headers and signs
//! - **BlockingClient** / **AsyncClient**: send a signed request and buffer the response
//! - **ApiResponse**: status, success flag and the buffered body, decodable on demand
//!
//! ## Example
//!
//! ```no_run
//! use reqgate_core::{
//!     ApiRequest, Context, ProvideCredential, Result, SignRequest, SignedRequest,
//!     SignedRequestFactory, Signer, SigningCredential,
//! };
//!
//! // Define your credential type
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     token: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.token.is_empty()
//!     }
//! }
//!
//! // Implement credential provider
//! #[derive(Debug)]
//! struct MyProvider;
//!
//! impl ProvideCredential for MyProvider {
//!     type Credential = MyCredential;
//!
//!     fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             token: "my-token".to_string(),
//!         }))
//!     }
//! }
//!
//! // Implement request signer
//! #[derive(Debug)]
//! struct MySigner;
//!
//! impl SignRequest for MySigner {
//!     type Credential = MyCredential;
//!
//!     fn sign_request(
//!         &self,
//!         _: &Context,
//!         req: &mut SignedRequest,
//!         cred: &Self::Credential,
//!     ) -> Result<()> {
//!         req.headers
//!             .insert("authorization", format!("Bearer {}", cred.token).parse()?);
//!         Ok(())
//!     }
//! }
//!
//! # fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), MyProvider, MySigner);
//! let factory = SignedRequestFactory::new(signer);
//!
//! let req = ApiRequest::builder("api.example.com")?
//!     .set_method("POST")?
//!     .set_path("/v1/items")?
//!     .set_json_payload(&serde_json::json!({"a": 24}))?
//!     .build();
//! let signed = factory.create(&req)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Traits
//!
//! - [`Env`]: For environment variable access
//! - [`ProvideCredential`]: For loading credentials from various sources
//! - [`SignRequest`]: For signing canonical requests
//! - [`SigningCredential`]: For validating credentials
//! - [`Codec`]: For payload serialization and body decoding
//! - [`http::HttpExecute`] / [`http::AsyncHttpExecute`]: For sending requests
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time manipulation utilities
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod http;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};

mod buffer;
pub use buffer::Buffer;
mod codec;
pub use codec::{Codec, JsonCodec};
mod context;
pub use context::{Context, Env, NoopEnv, OsEnv, StaticEnv};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod signer;
pub use signer::Signer;

mod request;
pub use request::{ApiRequest, ApiRequestBuilder, MultiValueMap, Payload};
mod response;
pub use response::ApiResponse;
mod signed_request;
pub use signed_request::{ContentStreamProvider, SignedRequest};
mod factory;
pub use factory::SignedRequestFactory;

mod consumer;
pub use consumer::{ResponseFuture, StreamingResponseConsumer};
mod client;
pub use client::BlockingClient;
mod async_client;
pub use async_client::AsyncClient;
