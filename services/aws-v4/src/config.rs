use std::fmt::{Debug, Formatter};

use reqgate_core::utils::Redact;
use reqgate_core::Context;

use crate::constants::*;

/// Config for signing API Gateway requests.
#[derive(Clone, Default)]
pub struct Config {
    /// `region` will be loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_REGION`, then `AWS_DEFAULT_REGION`
    pub region: Option<String>,
    /// `access_key_id` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_ACCESS_KEY_ID`
    pub access_key_id: Option<String>,
    /// `secret_access_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_SECRET_ACCESS_KEY`
    pub secret_access_key: Option<String>,
    /// `session_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_SESSION_TOKEN`
    pub session_token: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .finish()
    }
}

impl Config {
    /// Load config from env, keeping the values already set.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();

        if self.region.is_none() {
            self.region = envs
                .get(AWS_REGION)
                .or_else(|| envs.get(AWS_DEFAULT_REGION))
                .cloned();
        }
        if self.access_key_id.is_none() {
            self.access_key_id = envs.get(AWS_ACCESS_KEY_ID).cloned();
        }
        if self.secret_access_key.is_none() {
            self.secret_access_key = envs.get(AWS_SECRET_ACCESS_KEY).cloned();
        }
        if self.session_token.is_none() {
            self.session_token = envs.get(AWS_SESSION_TOKEN).cloned();
        }
        self
    }
}
