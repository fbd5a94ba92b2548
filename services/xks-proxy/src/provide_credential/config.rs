use crate::{Config, Credential};
use async_trait::async_trait;
use std::sync::Arc;
use xksbench_core::{Context, ProvideCredential, Result};

/// ConfigCredentialProvider takes the access id and secret key from a loaded [`Config`].
#[derive(Debug)]
pub struct ConfigCredentialProvider {
    config: Arc<Config>,
}

impl ConfigCredentialProvider {
    /// Create a new `ConfigCredentialProvider` instance.
    pub fn new(cfg: Arc<Config>) -> Self {
        Self { config: cfg }
    }
}

#[async_trait]
impl ProvideCredential for ConfigCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        if self.config.cks_access_id.is_empty() || self.config.cks_secret_key.is_empty() {
            return Ok(None);
        }

        Ok(Some(Credential {
            access_key_id: self.config.cks_access_id.clone(),
            secret_access_key: self.config.cks_secret_key.clone(),
        }))
    }
}
