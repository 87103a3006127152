use reqgate_core::{Context, OsEnv};

pub use reqgate_http_execute_reqwest::{ReqwestAsyncHttpExecute, ReqwestHttpExecute};

/// Create a context reading the process environment.
pub fn default_context() -> Context {
    Context::new().with_env(OsEnv)
}
