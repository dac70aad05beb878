use std::path::PathBuf;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::{
    CliConfig, active_profile_name, data_dir, resolve_api_key, resolve_api_url, resolve_model,
};
use crate::errors::CliError;
use crate::model::{GeminiBackend, ModelBackend};
use crate::output::OutputMode;
use crate::state::store::{Persisted, StateStore};

#[derive(Debug, Clone)]
pub struct Runtime {
    pub output: OutputMode,
    pub config: CliConfig,
    pub config_path: PathBuf,
    pub profile_override: Option<String>,
    pub api_url_override: Option<String>,
    pub model_override: Option<String>,
    pub timeout_ms: u64,
    pub retries: u32,
}

impl Runtime {
    pub fn active_profile(&self) -> String {
        active_profile_name(&self.config, self.profile_override.as_deref())
    }

    pub fn resolved_api_url(&self) -> Result<String, CliError> {
        resolve_api_url(
            &self.config,
            &self.active_profile(),
            self.api_url_override.as_deref(),
        )
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_api_key(&self.config, &self.active_profile())
    }

    pub fn resolved_model(&self) -> String {
        resolve_model(
            &self.config,
            &self.active_profile(),
            self.model_override.as_deref(),
        )
    }

    pub fn data_dir(&self) -> Result<PathBuf, CliError> {
        data_dir(&self.config, &self.active_profile())
    }

    pub fn api_client(&self) -> Result<ApiClient, CliError> {
        ApiClient::new(
            self.resolved_api_url()?,
            self.resolved_api_key(),
            self.timeout_ms,
            self.retries,
            self.output.debug,
        )
    }

    pub fn gemini(&self) -> Result<GeminiBackend, CliError> {
        Ok(GeminiBackend::new(self.api_client()?, self.resolved_model()))
    }

    pub fn backend(&self) -> Result<Arc<dyn ModelBackend>, CliError> {
        Ok(Arc::new(self.gemini()?))
    }

    pub fn store<T: Persisted>(&self) -> Result<StateStore<T>, CliError> {
        Ok(StateStore::new(&self.data_dir()?))
    }
}
