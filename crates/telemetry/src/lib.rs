//! Quota awareness for Bentofolio's model calls.
//!
//! Estimates token counts before a request, tracks daily and per-minute
//! usage against the free-tier limits of each model, and suggests a model
//! for a request given its complexity and the remaining quota.

pub mod models;
pub mod tokens;
pub mod usage;

pub use models::{
    CATALOG, Complexity, DEFAULT_MODEL, ModelInfo, ModelSuggestion, SelectionMode,
    analyze_complexity, model_info, suggest_model,
};
pub use tokens::{count_conversation_tokens, count_message_tokens, estimate_tokens};
pub use usage::{DailyLimit, DailyUsage, LimitCheck, MinuteUsage, UsageTracker, daily_limit};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("usage file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
