//! Configuration management for Conductor
//!
//! Handles loading, saving, and managing application configuration
//! including API keys, provider settings, and the default agent roster.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::agent::registry::default_research_agents;
use crate::agent::turn::{DEFAULT_MAX_HISTORY, DEFAULT_MAX_STEPS};
use crate::error::{Error, Result};
use crate::provider::catalog::{self, ModelTier};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default provider to use
    #[serde(default = "default_provider_name")]
    pub default_provider: String,
    /// Provider configurations keyed by name
    #[serde(default = "default_providers")]
    pub providers: HashMap<String, ProviderConfig>,
    /// Manager and agent settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// General application settings
    #[serde(default)]
    pub general: GeneralConfig,
}

fn default_provider_name() -> String {
    "anthropic".to_string()
}

fn default_providers() -> HashMap<String, ProviderConfig> {
    let mut providers = HashMap::new();
    providers.insert("anthropic".to_string(), ProviderConfig::anthropic());
    providers.insert("openai".to_string(), ProviderConfig::openai());
    providers.insert("gemini".to_string(), ProviderConfig::gemini());
    providers
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: default_provider_name(),
            providers: default_providers(),
            orchestrator: OrchestratorConfig::default(),
            general: GeneralConfig::default(),
        }
    }
}

impl Config {
    /// Get the provider config for the default provider
    pub fn get_default_provider(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.default_provider)
    }

    /// Get a specific provider config by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// List all configured provider names
    pub fn list_providers(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Model ids per tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTiers {
    pub fast: String,
    pub balanced: String,
    pub powerful: String,
}

impl ModelTiers {
    /// Catalog defaults for a provider (empty ids when unknown)
    pub fn for_provider(provider_id: &str) -> Self {
        let id = |tier| catalog::model_id(provider_id, tier).unwrap_or_default().to_string();
        Self {
            fast: id(ModelTier::Fast),
            balanced: id(ModelTier::Balanced),
            powerful: id(ModelTier::Powerful),
        }
    }
}

/// LLM Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider type: "anthropic", "openai", "gemini", etc.
    pub provider_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Model for ordinary turns
    pub model: String,
    /// Per-tier overrides; catalog defaults are used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_tiers: Option<ModelTiers>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::anthropic()
    }
}

impl ProviderConfig {
    fn from_catalog(provider_type: &str) -> Self {
        Self {
            provider_type: provider_type.to_string(),
            api_key: None,
            api_key_env: catalog::api_key_env(provider_type).map(str::to_string),
            model: catalog::default_model(provider_type)
                .unwrap_or_default()
                .to_string(),
            model_tiers: None,
        }
    }

    pub fn anthropic() -> Self {
        Self::from_catalog("anthropic")
    }

    pub fn openai() -> Self {
        Self::from_catalog("openai")
    }

    pub fn gemini() -> Self {
        Self::from_catalog("gemini")
    }

    /// Get the API key, checking environment variables if not set directly
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key
            && !key.is_empty()
        {
            return Some(key.clone());
        }

        let env_names = self
            .api_key_env
            .as_deref()
            .into_iter()
            .chain(catalog::api_key_env(&self.provider_type));
        for env_name in env_names {
            if let Ok(key) = std::env::var(env_name)
                && !key.is_empty()
            {
                return Some(key);
            }
        }

        None
    }

    /// Resolved tiers: explicit overrides, else catalog defaults with the
    /// configured model as the balanced tier
    pub fn get_model_tiers(&self) -> ModelTiers {
        if let Some(tiers) = &self.model_tiers {
            return tiers.clone();
        }
        let mut tiers = ModelTiers::for_provider(&self.provider_type);
        if !self.model.is_empty() {
            tiers.balanced = self.model.clone();
        }
        tiers
    }
}

/// Manager and worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Agents activated when a session starts
    pub active_agents: Vec<String>,
    /// Root directory for persisted agent artifacts
    pub output_dir: PathBuf,
    /// Upper bound on engine round trips in one turn
    pub max_turn_steps: usize,
    /// Messages the manager and each worker keep between turns
    pub max_history_messages: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            active_agents: default_research_agents(),
            output_dir: PathBuf::from("output"),
            max_turn_steps: DEFAULT_MAX_STEPS,
            max_history_messages: DEFAULT_MAX_HISTORY,
        }
    }
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self { config_path, config })
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("conductor").join("config.toml"))
    }

    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn set_default_provider(&mut self, name: &str) {
        self.config.default_provider = name.to_string();
    }

    pub fn default_provider(&self) -> &str {
        &self.config.default_provider
    }

    /// Get API key for a specific provider
    pub fn get_api_key_for(&self, provider_name: &str) -> Option<String> {
        self.config
            .get_provider(provider_name)
            .and_then(|p| p.get_api_key())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_path: PathBuf::from("config.toml"),
            config: Config::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_provider, "anthropic");
        assert!(config.providers.contains_key("anthropic"));
        assert!(config.providers.contains_key("openai"));

        let anthropic = config.get_default_provider().unwrap();
        assert_eq!(anthropic.provider_type, "anthropic");
        assert!(anthropic.model.contains("claude"));
        assert_eq!(config.orchestrator.max_turn_steps, 25);
        assert!(!config.orchestrator.active_agents.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("default_provider"));
        assert!(toml_str.contains("[providers.anthropic]"));
        assert!(toml_str.contains("[orchestrator]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.orchestrator.active_agents, config.orchestrator.active_agents);
    }

    #[test]
    fn test_model_tiers_use_configured_model() {
        let mut provider = ProviderConfig::openai();
        provider.model = "gpt-custom".to_string();
        let tiers = provider.get_model_tiers();
        assert_eq!(tiers.balanced, "gpt-custom");
        assert!(!tiers.powerful.is_empty());
    }

    #[test]
    fn test_direct_api_key_wins() {
        let mut provider = ProviderConfig::default();
        provider.api_key = Some("direct".to_string());
        assert_eq!(provider.get_api_key(), Some("direct".to_string()));
    }
}
