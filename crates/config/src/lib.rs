//! Configuration loading, validation, and management for Bentofolio.
//!
//! Loads configuration from `~/.bentofolio/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use bentofolio_core::GridConfig;
use bentofolio_layout::{AutoScrollConfig, FlipConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.bentofolio/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model provider used by the assistant
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model requested when smart selection is off
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Grid settings applied to new portfolios
    #[serde(default)]
    pub grid: GridSettings,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "github".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("rate_limit", &self.rate_limit)
            .field("grid", &self.grid)
            .field("layout", &self.layout)
            .field("storage", &self.storage)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

// ── Agent ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model round-trips allowed per user turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Per-call timeout for model requests; 0 disables it
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// History budget the context optimizer trims down to
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,

    /// Pick a catalog model per turn instead of always using `default_model`
    #[serde(default)]
    pub smart_selection: bool,

    /// One of balanced, cheap, fast, quality
    #[serde(default = "default_selection_mode")]
    pub selection_mode: String,

    /// Skip models whose daily request budget is exhausted
    #[serde(default = "default_true")]
    pub respect_quota: bool,
}

fn default_max_iterations() -> usize {
    5
}
fn default_call_timeout_secs() -> u64 {
    60
}
fn default_max_context_tokens() -> u32 {
    4000
}
fn default_selection_mode() -> String {
    "balanced".into()
}

const SELECTION_MODES: &[&str] = &["balanced", "cheap", "fast", "quality"];

impl AgentConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            call_timeout_secs: default_call_timeout_secs(),
            max_context_tokens: default_max_context_tokens(),
            smart_selection: false,
            selection_mode: default_selection_mode(),
            respect_quota: true,
        }
    }
}

// ── Rate limiting ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Minimum spacing between two requests to the same model
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Per-model requests-per-minute overrides
    #[serde(default = "default_model_overrides")]
    pub models: HashMap<String, u32>,
}

fn default_requests_per_minute() -> u32 {
    5
}
fn default_min_delay_ms() -> u64 {
    500
}
fn default_model_overrides() -> HashMap<String, u32> {
    HashMap::from([("gpt-4o".to_string(), 2)])
}

impl RateLimitConfig {
    pub fn requests_per_minute_for(&self, model: &str) -> u32 {
        self.models.get(model).copied().unwrap_or(self.requests_per_minute)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            min_delay_ms: default_min_delay_ms(),
            models: default_model_overrides(),
        }
    }
}

// ── Grid and layout ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSettings {
    #[serde(default = "default_max_columns")]
    pub max_columns: u32,

    #[serde(default = "default_cell_gap")]
    pub cell_gap: f64,

    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f64,
}

fn default_max_columns() -> u32 {
    4
}
fn default_cell_gap() -> f64 {
    8.0
}
fn default_aspect_ratio() -> f64 {
    1.0
}

impl GridSettings {
    pub fn grid_config(&self) -> GridConfig {
        GridConfig {
            max_columns: self.max_columns,
            cell_gap: self.cell_gap,
            aspect_ratio: self.aspect_ratio,
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            max_columns: default_max_columns(),
            cell_gap: default_cell_gap(),
            aspect_ratio: default_aspect_ratio(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Quiet period before a container resize triggers a repack
    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,

    #[serde(default = "default_animation_ms")]
    pub animation_ms: u64,

    /// Displacements at or below this many pixels are not animated
    #[serde(default = "default_flip_threshold_px")]
    pub flip_threshold_px: f64,

    /// Distance from the viewport edge where drag auto-scroll engages
    #[serde(default = "default_edge_zone_px")]
    pub edge_zone_px: f64,

    #[serde(default = "default_max_scroll_speed")]
    pub max_scroll_speed: f64,
}

fn default_resize_debounce_ms() -> u64 {
    100
}
fn default_animation_ms() -> u64 {
    200
}
fn default_flip_threshold_px() -> f64 {
    1.0
}
fn default_edge_zone_px() -> f64 {
    60.0
}
fn default_max_scroll_speed() -> f64 {
    28.0
}

impl LayoutConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn flip_config(&self) -> FlipConfig {
        FlipConfig {
            threshold_px: self.flip_threshold_px,
            duration: Duration::from_millis(self.animation_ms),
        }
    }

    pub fn auto_scroll_config(&self) -> AutoScrollConfig {
        AutoScrollConfig {
            edge_zone: self.edge_zone_px,
            max_speed: self.max_scroll_speed,
            ..AutoScrollConfig::default()
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: default_resize_debounce_ms(),
            animation_ms: default_animation_ms(),
            flip_threshold_px: default_flip_threshold_px(),
            edge_zone_px: default_edge_zone_px(),
            max_scroll_speed: default_max_scroll_speed(),
        }
    }
}

// ── Storage and gateway ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where `<identity>.json` portfolio documents live
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Owner identity used when none is supplied
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Content-addressed media files
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Daily usage counters, kept across runs
    #[serde(default = "default_usage_file")]
    pub usage_file: PathBuf,
}

fn default_data_dir() -> PathBuf {
    AppConfig::config_dir().join("data")
}
fn default_identity() -> String {
    "default".into()
}
fn default_assets_dir() -> PathBuf {
    AppConfig::config_dir().join("assets")
}
fn default_usage_file() -> PathBuf {
    AppConfig::config_dir().join("usage.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            identity: default_identity(),
            assets_dir: default_assets_dir(),
            usage_file: default_usage_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Largest accepted request body; inline media makes saves large
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    42617
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.bentofolio/config.toml).
    ///
    /// Also checks environment variables for the API key:
    /// - `BENTOFOLIO_API_KEY` (highest priority)
    /// - `GITHUB_TOKEN`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `BENTOFOLIO_*` / `GITHUB_TOKEN` overrides.
    pub fn apply_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("BENTOFOLIO_API_KEY")
                .ok()
                .or_else(|| std::env::var("GITHUB_TOKEN").ok())
                .filter(|key| !key.trim().is_empty());
        }

        if let Ok(provider) = std::env::var("BENTOFOLIO_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("BENTOFOLIO_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".bentofolio")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(1..=12).contains(&self.grid.max_columns) {
            return Err(ConfigError::ValidationError(
                "grid.max_columns must be between 1 and 12".into(),
            ));
        }

        if self.grid.cell_gap < 0.0 {
            return Err(ConfigError::ValidationError("grid.cell_gap must be >= 0".into()));
        }

        if self.grid.aspect_ratio <= 0.0 {
            return Err(ConfigError::ValidationError("grid.aspect_ratio must be > 0".into()));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError("agent.max_iterations must be >= 1".into()));
        }

        if !SELECTION_MODES.contains(&self.agent.selection_mode.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "agent.selection_mode must be one of {}",
                SELECTION_MODES.join(", ")
            )));
        }

        if self.rate_limit.requests_per_minute == 0 || self.rate_limit.models.values().any(|&rpm| rpm == 0) {
            return Err(ConfigError::ValidationError(
                "rate_limit requests per minute must be >= 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.resolve_api_key(&self.default_provider).is_some()
    }

    /// The provider-specific key wins over the global one.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            rate_limit: RateLimitConfig::default(),
            grid: GridSettings::default(),
            layout: LayoutConfig::default(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider, "github");
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.grid.grid_config(), GridConfig::default());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_model, config.default_model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.rate_limit.requests_per_minute_for("gpt-4o"), 2);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            default_model = "gpt-4o"

            [grid]
            max_columns = 6
            "#,
        )
        .unwrap();
        assert_eq!(parsed.default_model, "gpt-4o");
        assert_eq!(parsed.grid.max_columns, 6);
        assert_eq!(parsed.grid.cell_gap, 8.0);
        assert_eq!(parsed.rate_limit.requests_per_minute_for("gpt-4o-mini"), 5);
        assert_eq!(parsed.rate_limit.min_delay_ms, 500);
    }

    #[test]
    fn invalid_values_rejected() {
        let hot = AppConfig { default_temperature: 5.0, ..AppConfig::default() };
        assert!(hot.validate().is_err());

        let mut wide = AppConfig::default();
        wide.grid.max_columns = 13;
        assert!(wide.validate().is_err());

        let mut flat = AppConfig::default();
        flat.grid.aspect_ratio = 0.0;
        assert!(flat.validate().is_err());

        let mut negative_gap = AppConfig::default();
        negative_gap.grid.cell_gap = -1.0;
        assert!(negative_gap.validate().is_err());

        let mut stuck = AppConfig::default();
        stuck.agent.max_iterations = 0;
        assert!(stuck.validate().is_err());

        let mut unknown_mode = AppConfig::default();
        unknown_mode.agent.selection_mode = "turbo".into();
        assert!(unknown_mode.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "github");
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_temperature = \"warm\"").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("42617"));
        assert!(toml_str.contains("[rate_limit"));
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = AppConfig { api_key: Some("ghp_secret".into()), ..AppConfig::default() };
        config.providers.insert(
            "github".into(),
            ProviderConfig { api_key: Some("ghp_other".into()), ..Default::default() },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(!debug.contains("ghp_other"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn provider_key_overrides_global() {
        let mut config = AppConfig { api_key: Some("global".into()), ..AppConfig::default() };
        assert_eq!(config.resolve_api_key("github").as_deref(), Some("global"));
        config.providers.insert(
            "github".into(),
            ProviderConfig { api_key: Some("scoped".into()), ..Default::default() },
        );
        assert_eq!(config.resolve_api_key("github").as_deref(), Some("scoped"));

        let blank = AppConfig { api_key: Some("  ".into()), ..AppConfig::default() };
        assert!(!blank.has_api_key());
    }

    #[test]
    fn layout_section_maps_to_layout_types() {
        let layout = LayoutConfig { animation_ms: 300, ..LayoutConfig::default() };
        assert_eq!(layout.flip_config().duration, Duration::from_millis(300));
        assert_eq!(layout.auto_scroll_config().edge_zone, 60.0);
        assert_eq!(AgentConfig::default().call_timeout(), Some(Duration::from_secs(60)));
    }
}
