// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! AWS service support with convenience APIs
//!
//! This module provides API Gateway signing along with convenience functions
//! for building ready-to-use clients.

// Re-export all AWS signing types
pub use reqgate_aws_v4::*;

#[cfg(feature = "default-context")]
use crate::{
    default_context, AsyncClient, BlockingClient, ReqwestAsyncHttpExecute, ReqwestHttpExecute,
    SignedRequestFactory, Signer,
};

/// Default AWS Signer type with commonly used components
pub type DefaultSigner = crate::Signer<Credential>;

/// Create a default signer for API Gateway endpoints in `region`.
///
/// This function creates a signer with:
/// - Default context (OS environment)
/// - Default credential provider (reads `AWS_ACCESS_KEY_ID` and friends)
/// - Request signer for `execute-api` in the given region
#[cfg(feature = "default-context")]
pub fn default_signer(region: &str) -> DefaultSigner {
    Signer::new(
        default_context(),
        DefaultCredentialProvider::new(),
        RequestSigner::execute_api(region),
    )
}

/// Create a blocking client signing with [`default_signer`].
///
/// # Example
///
/// ```no_run
/// # fn main() -> reqgate_core::Result<()> {
/// let client = reqgate::aws::default_client("us-east-1");
///
/// let req = reqgate::ApiRequest::builder("abc123.execute-api.us-east-1.amazonaws.com")?
///     .set_path("/prod/items")?
///     .build();
/// let resp = client.invoke(&req)?;
/// assert!(resp.is_successful());
/// # Ok(())
/// # }
/// ```
///
/// # Note
///
/// The blocking transport must not be created or used from within an async
/// runtime; use [`default_async_client`] there.
#[cfg(feature = "default-context")]
pub fn default_client(region: &str) -> BlockingClient<Credential> {
    BlockingClient::new(
        SignedRequestFactory::new(default_signer(region)),
        ReqwestHttpExecute::default(),
    )
}

/// Create an async client signing with [`default_signer`].
///
/// # Customization
///
/// Build the client by hand to use other credentials:
///
/// ```no_run
/// use reqgate::aws::{RequestSigner, StaticCredentialProvider};
/// use reqgate::{AsyncClient, Context, ReqwestAsyncHttpExecute, SignedRequestFactory, Signer};
///
/// let signer = Signer::new(
///     Context::new(),
///     StaticCredentialProvider::new("my-access-key", "my-secret-key"),
///     RequestSigner::execute_api("us-east-1"),
/// );
/// let client = AsyncClient::new(
///     SignedRequestFactory::new(signer),
///     ReqwestAsyncHttpExecute::default(),
/// );
/// ```
#[cfg(feature = "default-context")]
pub fn default_async_client(region: &str) -> AsyncClient<Credential> {
    AsyncClient::new(
        SignedRequestFactory::new(default_signer(region)),
        ReqwestAsyncHttpExecute::default(),
    )
}
