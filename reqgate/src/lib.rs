#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use reqgate_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::{default_context, ReqwestAsyncHttpExecute, ReqwestHttpExecute};

#[cfg(feature = "aws")]
pub mod aws;
