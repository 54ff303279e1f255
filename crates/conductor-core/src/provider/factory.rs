//! Provider Factory Module
//!
//! Centralizes API key retrieval, model tier resolution, and engine
//! instantiation for the CLI.

use tracing::debug;

use super::catalog;
use super::genai_provider::GenAIProvider;
use crate::config::{ConfigManager, ModelTiers, ProviderConfig};
use crate::error::{Error, Result};

/// Get API key for a provider, checking config then environment variables
pub fn get_api_key(config_manager: &ConfigManager, provider_id: &str) -> Option<String> {
    if let Some(key) = config_manager.get_api_key_for(provider_id) {
        return Some(key);
    }

    catalog::api_key_env(provider_id).and_then(|env_var| std::env::var(env_var).ok())
}

/// Get model tiers from config or use provider defaults
pub fn get_model_tiers(config_manager: &ConfigManager, provider_id: &str) -> ModelTiers {
    match config_manager.config().get_provider(provider_id) {
        Some(provider_config) => provider_config.get_model_tiers(),
        None => ModelTiers::for_provider(provider_id),
    }
}

/// Create an engine from config, falling back to environment variables
///
/// `model_override` replaces the balanced tier (ordinary turns) only.
pub fn create_engine_from_config(
    config_manager: &ConfigManager,
    provider_override: Option<&str>,
    model_override: Option<&str>,
) -> Result<GenAIProvider> {
    let provider_id = provider_override.unwrap_or(config_manager.default_provider());

    if catalog::get(provider_id).is_none()
        && config_manager.config().get_provider(provider_id).is_none()
    {
        return Err(Error::Config(format!("Unknown provider: {}", provider_id)));
    }

    let mut tiers = get_model_tiers(config_manager, provider_id);
    if let Some(model) = model_override {
        tiers.balanced = model.to_string();
    }

    let needs_key = catalog::api_key_env(provider_id).is_some()
        || config_manager
            .config()
            .get_provider(provider_id)
            .and_then(|p: &ProviderConfig| p.api_key_env.as_ref())
            .is_some();

    debug!(provider = %provider_id, balanced = %tiers.balanced, powerful = %tiers.powerful, "Creating engine");

    match get_api_key(config_manager, provider_id) {
        Some(key) => Ok(GenAIProvider::with_api_key(provider_id, &key, tiers)),
        None if needs_key => Err(Error::Config(format!(
            "No API key configured for provider '{}'",
            provider_id
        ))),
        None => Ok(GenAIProvider::new(provider_id, tiers)),
    }
}
