//! Provider router: builds model clients from config and hands out the
//! default one.
//!
//! Every client built here sits behind the shared [`RateLimiter`].

use crate::openai_compat::{GITHUB_MODELS_BASE_URL, OpenAiCompatClient};
use crate::rate_limit::{RateLimitedClient, RateLimiter};
use bentofolio_config::AppConfig;
use bentofolio_core::provider::ModelClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Routes chat requests to the configured backend.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn ModelClient>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, client: Arc<dyn ModelClient>) {
        self.providers.insert(name.into(), client);
    }

    /// The default client, if its provider could be configured.
    pub fn default(&self) -> Option<Arc<dyn ModelClient>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelClient>> {
        self.providers.get(name).cloned()
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build rate-limited clients for every provider that has credentials.
///
/// A provider without an API key is skipped, so a fresh install yields a
/// router whose [`ProviderRouter::default`] is `None`. Local servers that
/// need no key (`ollama`, `vllm`) are always built.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let mut router = ProviderRouter::new(&config.default_provider);

    let mut names: Vec<&str> = config.providers.keys().map(String::as_str).collect();
    if !names.contains(&config.default_provider.as_str()) {
        names.push(&config.default_provider);
    }

    for name in names {
        let Some(api_key) = config.resolve_api_key(name).or_else(|| keyless_default(name)) else {
            debug!(provider = name, "No API key, provider not registered");
            continue;
        };

        let base_url = config
            .providers
            .get(name)
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| default_base_url(name));

        let client: Arc<dyn ModelClient> = Arc::new(OpenAiCompatClient::new(name, &base_url, api_key));
        router.register(name, Arc::new(RateLimitedClient::new(client, limiter.clone())));
        info!(provider = name, base_url = %base_url, "Registered model provider");
    }

    router
}

fn keyless_default(provider_name: &str) -> Option<String> {
    matches!(provider_name, "ollama" | "vllm").then(|| provider_name.to_string())
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "github" => GITHUB_MODELS_BASE_URL.into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => GITHUB_MODELS_BASE_URL.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bentofolio_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("github");
        router.register("github", Arc::new(OpenAiCompatClient::github("ghp_test")));

        assert!(router.get("github").is_some());
        assert!(router.get("nonexistent").is_none());
        assert_eq!(router.default().unwrap().name(), "github");
    }

    #[test]
    fn no_key_means_no_default_client() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        assert!(router.default().is_none());
        assert!(router.list().is_empty());
    }

    #[test]
    fn global_key_builds_default_provider() {
        let config = AppConfig { api_key: Some("ghp_test".into()), ..AppConfig::default() };
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["github"]);
        assert_eq!(router.default().unwrap().name(), "github");
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = AppConfig { api_key: Some("ghp_test".into()), ..AppConfig::default() };
        config.providers.insert("ollama".into(), ProviderConfig::default());
        config.providers.insert(
            "openai".into(),
            ProviderConfig { api_key: Some("sk-test".into()), ..Default::default() },
        );
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["github", "ollama", "openai"]);
    }

    #[test]
    fn default_urls() {
        assert_eq!(default_base_url("github"), GITHUB_MODELS_BASE_URL);
        assert!(default_base_url("ollama").contains("11434"));
    }
}
