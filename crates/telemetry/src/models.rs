//! Model catalog, task complexity scoring, and quota-aware model suggestion.

use crate::usage::UsageTracker;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Balanced,
    Cheap,
    Fast,
    Quality,
}

impl FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "cheap" => Ok(Self::Cheap),
            "fast" => Ok(Self::Fast),
            "quality" => Ok(Self::Quality),
            other => Err(format!("unknown selection mode '{other}' (expected balanced, cheap, fast or quality)")),
        }
    }
}

/// Static metadata for a catalog model. Costs are USD per 1M tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub complexity: &'static [Complexity],
    pub best_for: &'static str,
    pub input_cost: f64,
    pub output_cost: f64,
    pub context_window: u32,
    pub speed_ms: u32,
}

impl ModelInfo {
    fn blended_cost(&self) -> f64 {
        self.input_cost + self.output_cost
    }

    fn quality_rank(&self) -> f64 {
        self.input_cost * 10.0 + self.output_cost
    }
}

pub const CATALOG: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-4o-mini",
        label: "GPT-4o Mini (Recommended)",
        complexity: &[Complexity::Simple, Complexity::Moderate],
        best_for: "quick responses, chat, general portfolio edits",
        input_cost: 0.15,
        output_cost: 0.60,
        context_window: 128_000,
        speed_ms: 1000,
    },
    ModelInfo {
        id: "gpt-4o",
        label: "GPT-4o (Premium)",
        complexity: &[Complexity::Moderate, Complexity::Complex],
        best_for: "complex reasoning, multi-step restructuring",
        input_cost: 2.50,
        output_cost: 10.0,
        context_window: 128_000,
        speed_ms: 2000,
    },
    ModelInfo {
        id: "llama-3.3-70b",
        label: "Llama 3.3 70B",
        complexity: &[Complexity::Simple, Complexity::Moderate],
        best_for: "general purpose, open-weight alternative",
        input_cost: 0.71,
        output_cost: 0.71,
        context_window: 8192,
        speed_ms: 1500,
    },
    ModelInfo {
        id: "phi-4-mini",
        label: "Phi-4 Mini (Most Efficient)",
        complexity: &[Complexity::Simple],
        best_for: "lightweight tasks, maximum daily usage",
        input_cost: 0.08,
        output_cost: 0.30,
        context_window: 4096,
        speed_ms: 800,
    },
];

pub fn model_info(id: &str) -> Option<&'static ModelInfo> {
    CATALOG.iter().find(|m| m.id == id)
}

const COMPLEX_KEYWORDS: &[&str] = &[
    "analyze",
    "compare",
    "design",
    "architecture",
    "optimize",
    "debug",
    "refactor",
    "explain",
    "review",
];

/// Score a request by prompt length, history length, tool count and
/// keywords.
pub fn analyze_complexity(prompt: &str, conversation_len: usize, tool_count: usize) -> Complexity {
    let mut score = 0;

    let len = prompt.chars().count();
    if len > 500 {
        score += 2;
    } else if len > 200 {
        score += 1;
    }

    if conversation_len > 10 {
        score += 2;
    } else if conversation_len > 5 {
        score += 1;
    }

    if tool_count > 3 {
        score += 2;
    } else if tool_count > 0 {
        score += 1;
    }

    let lower = prompt.to_lowercase();
    if COMPLEX_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        score += 2;
    }

    match score {
        s if s >= 5 => Complexity::Complex,
        s if s >= 2 => Complexity::Moderate,
        _ => Complexity::Simple,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub model: String,
    pub label: String,
    pub requests_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSuggestion {
    pub model: String,
    pub reason: String,
    pub alternatives: Vec<Alternative>,
}

/// Pick a catalog model for the given complexity and mode.
///
/// With `respect_quota`, models whose daily request budget is exhausted are
/// skipped. When nothing qualifies the default model is returned.
pub fn suggest_model(
    usage: &UsageTracker,
    complexity: Complexity,
    mode: SelectionMode,
    respect_quota: bool,
) -> ModelSuggestion {
    let mut candidates: Vec<(&ModelInfo, u32)> = CATALOG
        .iter()
        .filter(|m| m.complexity.contains(&complexity))
        .map(|m| (m, usage.daily_usage(m.id)))
        .filter(|(_, daily)| !respect_quota || daily.has_requests_left())
        .map(|(m, daily)| (m, daily.requests_remaining()))
        .collect();

    if candidates.is_empty() {
        return ModelSuggestion {
            model: DEFAULT_MODEL.to_string(),
            reason: "No models matched criteria, using default".to_string(),
            alternatives: Vec::new(),
        };
    }

    let (chosen, why) = match mode {
        SelectionMode::Cheap => {
            candidates.sort_by(|a, b| a.0.blended_cost().total_cmp(&b.0.blended_cost()));
            (0, "cost efficiency")
        }
        SelectionMode::Fast => {
            candidates.sort_by_key(|(m, _)| m.speed_ms);
            (0, "speed")
        }
        SelectionMode::Quality => {
            candidates.sort_by(|a, b| b.0.quality_rank().total_cmp(&a.0.quality_rank()));
            (0, "best quality")
        }
        SelectionMode::Balanced => {
            let preferred = candidates.iter().position(|(m, _)| m.id == DEFAULT_MODEL).unwrap_or(0);
            (preferred, "balanced cost/quality")
        }
    };

    let selected = candidates[chosen].0;
    let alternatives = candidates
        .iter()
        .filter(|(m, _)| m.id != selected.id)
        .take(2)
        .map(|(m, remaining)| Alternative {
            model: m.id.to_string(),
            label: m.label.to_string(),
            requests_remaining: *remaining,
        })
        .collect();

    ModelSuggestion {
        model: selected.id.to_string(),
        reason: format!("Selected for {why} ({})", selected.label),
        alternatives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_plain_prompt_is_simple() {
        assert_eq!(analyze_complexity("add a card", 0, 0), Complexity::Simple);
    }

    #[test]
    fn tools_and_history_make_moderate() {
        assert_eq!(analyze_complexity("add a card", 6, 1), Complexity::Moderate);
    }

    #[test]
    fn keywords_and_many_tools_make_complex() {
        let prompt = "Please review and redesign my sections";
        assert_eq!(analyze_complexity(prompt, 11, 20), Complexity::Complex);
    }

    #[test]
    fn balanced_prefers_mini() {
        let usage = UsageTracker::new();
        let suggestion = suggest_model(&usage, Complexity::Moderate, SelectionMode::Balanced, true);
        assert_eq!(suggestion.model, "gpt-4o-mini");
        assert_eq!(suggestion.alternatives.len(), 2);
    }

    #[test]
    fn complex_tasks_get_gpt4o() {
        let usage = UsageTracker::new();
        let suggestion = suggest_model(&usage, Complexity::Complex, SelectionMode::Balanced, true);
        assert_eq!(suggestion.model, "gpt-4o");
    }

    #[test]
    fn cheap_and_fast_modes() {
        let usage = UsageTracker::new();
        assert_eq!(suggest_model(&usage, Complexity::Simple, SelectionMode::Cheap, true).model, "phi-4-mini");
        assert_eq!(suggest_model(&usage, Complexity::Simple, SelectionMode::Fast, true).model, "phi-4-mini");
        assert_eq!(suggest_model(&usage, Complexity::Simple, SelectionMode::Quality, true).model, "llama-3.3-70b");
    }

    #[test]
    fn exhausted_models_are_skipped() {
        let usage = UsageTracker::new();
        for _ in 0..50 {
            usage.record_request("gpt-4o");
        }
        let suggestion = suggest_model(&usage, Complexity::Complex, SelectionMode::Balanced, true);
        assert_eq!(suggestion.model, DEFAULT_MODEL);
        assert_eq!(suggestion.reason, "No models matched criteria, using default");

        let ignoring = suggest_model(&usage, Complexity::Complex, SelectionMode::Balanced, false);
        assert_eq!(ignoring.model, "gpt-4o");
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Quality".parse::<SelectionMode>(), Ok(SelectionMode::Quality));
        assert!("turbo".parse::<SelectionMode>().is_err());
    }
}
