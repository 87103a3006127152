//! Transports for reqgate built on [reqwest](https://docs.rs/reqwest).
//!
//! - [`ReqwestHttpExecute`] runs exchanges on the calling thread through
//!   `reqwest::blocking`.
//! - [`ReqwestAsyncHttpExecute`] streams response bodies through the async
//!   `reqwest::Client`, releasing bytes only as the consumer grants credit.

#![warn(missing_docs)]

mod blocking;
pub use blocking::ReqwestHttpExecute;

mod streaming;
pub use streaming::ReqwestAsyncHttpExecute;
