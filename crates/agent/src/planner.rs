//! Pre-flight planning for one turn: pick the model, check quota, and shrink
//! the history when the quota check fails.

use crate::context::{OptimizationStats, optimize_context};
use bentofolio_core::message::Message;
use bentofolio_telemetry::{
    Complexity, SelectionMode, UsageTracker, analyze_complexity, count_conversation_tokens,
    suggest_model,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Knobs for [`plan_turn`].
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Used when `selection` is `None`.
    pub default_model: String,
    pub selection: Option<SelectionMode>,
    pub respect_quota: bool,
    pub max_context_tokens: u32,
    /// Output estimate passed to the quota check.
    pub max_output_tokens: u32,
    pub tool_count: usize,
}

/// What the orchestrator sends on its first call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPlan {
    pub model: String,
    pub complexity: Complexity,
    pub reason: String,
    /// History followed by the user message, possibly optimized. No system
    /// prompt: the orchestrator builds that from the live state.
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationStats>,
    /// Soft quota warnings (usage above the warning threshold).
    pub warnings: Vec<String>,
    /// Hard limits the request is still expected to break.
    pub exceeded: Vec<String>,
}

pub fn plan_turn(
    usage: &UsageTracker,
    options: &PlanOptions,
    user_message: &str,
    history: &[Message],
) -> TurnPlan {
    let complexity = analyze_complexity(user_message, history.len(), options.tool_count);

    let (model, reason) = match options.selection {
        Some(mode) => {
            let suggestion = suggest_model(usage, complexity, mode, options.respect_quota);
            debug!(model = %suggestion.model, reason = %suggestion.reason, "Model suggested");
            let reason = format!("Using {} for {complexity} task ({})", suggestion.model, suggestion.reason);
            (suggestion.model, reason)
        }
        None => (options.default_model.clone(), format!("Using configured model {}", options.default_model)),
    };

    let mut messages = history.to_vec();
    messages.push(Message::user(user_message));

    let input = u64::from(count_conversation_tokens(&messages));
    let output = u64::from(options.max_output_tokens);
    let mut check = usage.check_limits(&model, input, output);
    let mut optimization = None;

    if !check.allowed {
        warn!(model = %model, exceeded = ?check.exceeded, "Quota check failed, optimizing context");
        let (optimized, stats) = optimize_context(&messages, options.max_context_tokens);
        messages = optimized;
        let input = u64::from(count_conversation_tokens(&messages));
        let retry = usage.check_limits(&model, input, output);
        if retry.allowed {
            info!(model = %model, tokens_removed = stats.tokens_removed, "Context optimized to fit within limits");
        }
        optimization = Some(stats);
        check.exceeded = retry.exceeded;
        check.warnings = retry.warnings;
    }

    for warning in &check.warnings {
        warn!(model = %model, "{warning}");
    }

    TurnPlan {
        model,
        complexity,
        reason,
        messages,
        optimization,
        warnings: check.warnings,
        exceeded: check.exceeded,
    }
}
