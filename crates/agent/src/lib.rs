//! The Bentofolio agent: turns a chat message into portfolio edits.
//!
//! Each turn follows a **call → act → observe** cycle:
//!
//! 1. **Plan** the turn: pick a model, check quota, optimize history if needed
//! 2. **Build context**: a system prompt rendered from the current portfolio,
//!    the history, and the user message
//! 3. **Call the model** with every tool schema from the registry
//! 4. **If tool calls**: run them against the store, append their results,
//!    rebuild the system prompt, and go back to step 3
//! 5. **If text**: that is the reply
//!
//! The loop is bounded by a fixed iteration cap. A failed model call rolls the
//! store back to where the turn started.

pub mod context;
pub mod orchestrator;
pub mod planner;
pub mod prompt;

pub use context::{
    BudgetFit, DEFAULT_MAX_CONTEXT_TOKENS, OptimizationStats, compress_conversation, optimize_context,
    summary_hint, trim_history, will_fit_budget,
};
pub use orchestrator::{
    DEFAULT_MAX_ITERATIONS, ITERATION_CAP_MESSAGE, NO_PROVIDER_MESSAGE, ToolOrchestrator, TurnOutcome,
};
pub use planner::{PlanOptions, TurnPlan, plan_turn};
pub use prompt::build_system_prompt;
