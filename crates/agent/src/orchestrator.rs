//! The tool orchestration loop.

use crate::context::DEFAULT_MAX_CONTEXT_TOKENS;
use crate::planner::{PlanOptions, TurnPlan, plan_turn};
use crate::prompt::build_system_prompt;
use bentofolio_config::AppConfig;
use bentofolio_core::error::ProviderError;
use bentofolio_core::event::{DomainEvent, EventBus};
use bentofolio_core::message::{Message, Role};
use bentofolio_core::provider::{ChatRequest, ChatResponse, ModelClient};
use bentofolio_core::store::PortfolioStore;
use bentofolio_core::tool::{ToolCall, ToolRegistry, ToolResult};
use bentofolio_telemetry::{
    DEFAULT_MODEL, SelectionMode, UsageTracker, count_conversation_tokens, estimate_tokens,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

pub const ITERATION_CAP_MESSAGE: &str = "I reached the maximum number of actions for this request. \
Here's what I've done so far. Please check the preview and let me know if you need anything else.";

pub const NO_PROVIDER_MESSAGE: &str = "No model provider is configured yet, so I can't edit the portfolio for you. \
Set BENTOFOLIO_API_KEY (or GITHUB_TOKEN to use GitHub Models), or add an api_key under \
[providers.github] in ~/.bentofolio/config.toml, then send your message again.";

const EMPTY_REPLY_TEXT: &str = "Done.";

/// Result of one user turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub final_text: String,
    /// The caller's history plus every message this turn produced, starting
    /// with the user message.
    pub updated_history: Vec<Message>,
    pub iterations: usize,
    pub tool_calls: usize,
    pub hit_iteration_cap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub warnings: Vec<String>,
}

/// Drives `model → tools → model` until the model stops asking for tools or
/// the iteration cap is reached.
pub struct ToolOrchestrator {
    client: Option<Arc<dyn ModelClient>>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: usize,
    call_timeout: Option<Duration>,
    max_context_tokens: u32,
    selection: Option<SelectionMode>,
    respect_quota: bool,
    usage: Arc<UsageTracker>,
    event_bus: Arc<EventBus>,
}

impl ToolOrchestrator {
    pub fn new(tools: Arc<ToolRegistry>, client: Option<Arc<dyn ModelClient>>) -> Self {
        Self {
            client,
            tools,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: Some(1000),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            call_timeout: None,
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            selection: None,
            respect_quota: true,
            usage: Arc::new(UsageTracker::new()),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Orchestrator over the full portfolio tool catalogue.
    pub fn from_config(config: &AppConfig, client: Option<Arc<dyn ModelClient>>) -> Self {
        Self::new(Arc::new(bentofolio_tools::default_registry()), client).with_config(config)
    }

    /// Apply model, sampling, loop and quota settings from configuration.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.model = config.default_model.clone();
        self.temperature = config.default_temperature;
        self.max_tokens = Some(config.default_max_tokens);
        self.max_iterations = config.agent.max_iterations.max(1);
        self.call_timeout = config.agent.call_timeout();
        self.max_context_tokens = config.agent.max_context_tokens;
        self.respect_quota = config.agent.respect_quota;
        self.selection = if config.agent.smart_selection {
            match config.agent.selection_mode.parse::<SelectionMode>() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    warn!("{e}; falling back to balanced selection");
                    Some(SelectionMode::Balanced)
                }
            }
        } else {
            None
        };
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Pick a catalog model per turn instead of the configured one.
    pub fn with_selection(mut self, mode: SelectionMode) -> Self {
        self.selection = Some(mode);
        self
    }

    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    /// Run one user turn against `store`.
    ///
    /// Tool failures never surface here; they are fed back to the model. A
    /// model call failure rolls the store back to where the turn started and
    /// is returned as the error.
    pub async fn run(
        &self,
        user_message: &str,
        history: &[Message],
        store: &PortfolioStore,
    ) -> Result<TurnOutcome, ProviderError> {
        let Some(client) = &self.client else {
            info!("No model client configured, returning setup guidance");
            let mut updated_history = history.to_vec();
            updated_history.push(Message::user(user_message));
            updated_history.push(Message::assistant(NO_PROVIDER_MESSAGE));
            return Ok(TurnOutcome {
                final_text: NO_PROVIDER_MESSAGE.to_string(),
                updated_history,
                iterations: 0,
                tool_calls: 0,
                hit_iteration_cap: false,
                model: None,
                warnings: Vec::new(),
            });
        };

        let plan = plan_turn(
            &self.usage,
            &PlanOptions {
                default_model: self.model.clone(),
                selection: self.selection,
                respect_quota: self.respect_quota,
                max_context_tokens: self.max_context_tokens,
                max_output_tokens: self.max_tokens.unwrap_or(1000),
                tool_count: self.tools.len(),
            },
            user_message,
            history,
        );
        info!(
            model = %plan.model,
            complexity = %plan.complexity,
            history = history.len(),
            "Processing chat turn"
        );

        let checkpoint = store.checkpoint();
        let mut own_changes = 0;
        match self.drive(client.as_ref(), plan, user_message, history, store, &mut own_changes).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(error = %e, own_changes, "Model call failed, rolling back turn");
                let context = if store.rollback_own(checkpoint, own_changes) {
                    "chat turn"
                } else {
                    "chat turn (not rolled back: portfolio edited concurrently)"
                };
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: context.into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        client: &dyn ModelClient,
        plan: TurnPlan,
        user_message: &str,
        history: &[Message],
        store: &PortfolioStore,
        own_changes: &mut u64,
    ) -> Result<TurnOutcome, ProviderError> {
        let definitions = self.tools.definitions();
        let mut messages = Vec::with_capacity(plan.messages.len() + 1);
        messages.push(Message::system(store.read(build_system_prompt)));
        messages.extend(plan.messages);

        let mut new_messages = vec![Message::user(user_message)];
        let mut iterations = 0;
        let mut tool_calls = 0;
        let mut hit_iteration_cap = false;

        loop {
            if iterations == self.max_iterations {
                hit_iteration_cap = true;
                warn!(iterations, "Max tool iterations reached, stopping turn");
                self.event_bus.publish(DomainEvent::IterationCapReached {
                    iterations,
                    timestamp: Utc::now(),
                });
                break;
            }
            iterations += 1;
            debug!(iteration = iterations, messages = messages.len(), "Orchestrator iteration");

            let request = ChatRequest {
                model: plan.model.clone(),
                messages: messages.clone(),
                tools: definitions.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };
            let response = self.call_model(client, request).await?;
            self.record_usage(&plan.model, &messages, &response);

            if !response.wants_tools() {
                let reply = Message::assistant(response.message.content);
                messages.push(reply.clone());
                new_messages.push(reply);
                break;
            }

            let requested = response.message.tool_calls.clone();
            debug!(tool_count = requested.len(), "Executing tool calls");
            let assistant = Message::assistant(response.message.content).with_tool_calls(requested.clone());
            messages.push(assistant.clone());
            new_messages.push(assistant);

            for call in &requested {
                let started = Instant::now();
                let revision = store.revision();
                let result = match ToolCall::from_message(call) {
                    Ok(decoded) => self.tools.dispatch(&decoded, store),
                    Err(e) => ToolResult::fail(e.to_string()),
                };
                *own_changes += store.revision().saturating_sub(revision);
                let duration_ms = started.elapsed().as_millis() as u64;
                tool_calls += 1;

                if result.success {
                    debug!(tool = %call.name, duration_ms, "Tool succeeded");
                } else {
                    warn!(tool = %call.name, error = ?result.error, "Tool failed");
                }
                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: call.name.clone(),
                    success: result.success,
                    duration_ms,
                    timestamp: Utc::now(),
                });

                let tool_message = Message::tool_result(&call.id, &call.name, result.to_content());
                messages.push(tool_message.clone());
                new_messages.push(tool_message);
            }

            // Tools may have changed the portfolio.
            messages[0] = Message::system(store.read(build_system_prompt));
        }

        if hit_iteration_cap && new_messages.last().is_some_and(|m| m.role != Role::Assistant) {
            new_messages.push(Message::assistant(ITERATION_CAP_MESSAGE));
        }

        let final_text = new_messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY_TEXT.to_string());

        info!(iterations, tool_calls, hit_iteration_cap, "Chat turn complete");

        let mut updated_history = history.to_vec();
        updated_history.extend(new_messages);
        Ok(TurnOutcome {
            final_text,
            updated_history,
            iterations,
            tool_calls,
            hit_iteration_cap,
            model: Some(plan.model),
            warnings: plan.warnings,
        })
    }

    async fn call_model(
        &self,
        client: &dyn ModelClient,
        request: ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, client.chat(request))
                .await
                .map_err(|_| {
                    ProviderError::Timeout(format!(
                        "{} did not respond within {}s",
                        client.name(),
                        limit.as_secs()
                    ))
                })?,
            None => client.chat(request).await,
        }
    }

    fn record_usage(&self, model: &str, sent: &[Message], response: &ChatResponse) {
        self.usage.record_request(model);
        let (input, output, total) = match response.usage {
            Some(u) => (u.prompt_tokens, u.completion_tokens, u.total_tokens),
            None => {
                let input = count_conversation_tokens(sent);
                let output = estimate_tokens(&response.message.content);
                (input, output, input + output)
            }
        };
        self.usage.record_tokens(model, input.into(), output.into());
        self.event_bus.publish(DomainEvent::ResponseGenerated {
            model: response.model.clone(),
            tokens_used: total,
            timestamp: Utc::now(),
        });
    }
}
