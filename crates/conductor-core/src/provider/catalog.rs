//! Provider catalog
//!
//! Loads provider data (api key variables, per-tier model ids) from embedded
//! JSON at compile time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

const PROVIDERS_JSON: &str = include_str!("providers.json");

/// Model tier (fast, balanced, powerful)
///
/// Ordinary turns run on `Balanced`; multi-source synthesis and code
/// generation run on `Powerful`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Balanced,
    Powerful,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub api_key_env: Option<String>,
    pub models: HashMap<ModelTier, Model>,
}

impl Provider {
    /// Get model ID for a tier (falls back to balanced)
    pub fn model_id(&self, tier: ModelTier) -> &str {
        self.models
            .get(&tier)
            .or_else(|| self.models.get(&ModelTier::Balanced))
            .map(|m| m.id.as_str())
            .unwrap_or("")
    }
}

#[derive(Deserialize)]
struct RawCatalog {
    providers: HashMap<String, RawProvider>,
}

#[derive(Deserialize)]
struct RawProvider {
    name: String,
    api_key_env: Option<String>,
    models: RawModels,
}

#[derive(Deserialize)]
struct RawModels {
    fast: Model,
    balanced: Model,
    powerful: Model,
}

static CATALOG: LazyLock<HashMap<String, Provider>> = LazyLock::new(|| {
    let raw: RawCatalog =
        serde_json::from_str(PROVIDERS_JSON).expect("failed to parse providers.json");

    raw.providers
        .into_iter()
        .map(|(id, raw)| {
            let mut models = HashMap::new();
            models.insert(ModelTier::Fast, raw.models.fast);
            models.insert(ModelTier::Balanced, raw.models.balanced);
            models.insert(ModelTier::Powerful, raw.models.powerful);

            let provider = Provider {
                id: id.clone(),
                name: raw.name,
                api_key_env: raw.api_key_env,
                models,
            };
            (id, provider)
        })
        .collect()
});

/// Get a provider by ID
pub fn get(provider_id: &str) -> Option<&'static Provider> {
    CATALOG.get(provider_id)
}

/// Get all provider IDs
pub fn ids() -> impl Iterator<Item = &'static str> {
    CATALOG.keys().map(|s: &String| s.as_str())
}

/// Get API key environment variable for a provider
pub fn api_key_env(provider_id: &str) -> Option<&'static str> {
    get(provider_id).and_then(|p| p.api_key_env.as_deref())
}

/// Get default (balanced) model ID for a provider
pub fn default_model(provider_id: &str) -> Option<&'static str> {
    model_id(provider_id, ModelTier::Balanced)
}

/// Get model ID for a provider and tier
pub fn model_id(provider_id: &str, tier: ModelTier) -> Option<&'static str> {
    get(provider_id).map(|p| p.model_id(tier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(get("anthropic").is_some());
        assert!(get("openai").is_some());
        assert!(get("gemini").is_some());
        assert!(get("nope").is_none());
    }

    #[test]
    fn test_api_key_env() {
        assert_eq!(api_key_env("anthropic"), Some("ANTHROPIC_API_KEY"));
        assert_eq!(api_key_env("ollama"), None);
    }

    #[test]
    fn test_tiers_differ_for_synthesis() {
        let balanced = model_id("anthropic", ModelTier::Balanced).unwrap();
        let powerful = model_id("anthropic", ModelTier::Powerful).unwrap();
        assert!(balanced.contains("claude"));
        assert_ne!(balanced, powerful);
    }
}
