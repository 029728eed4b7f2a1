//! End-to-end tests for the Bentofolio pipeline.
//!
//! These drive the assistant with a scripted model client against a real
//! store, then persist to disk, reload, lay out and export, the same way the
//! `chat`, `layout` and `export` commands do.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bentofolio_agent::ToolOrchestrator;
use bentofolio_core::error::ProviderError;
use bentofolio_core::message::{Message, MessageToolCall, Role};
use bentofolio_core::provider::{ChatRequest, ChatResponse, FinishReason, ModelClient, Usage};
use bentofolio_core::{CardSize, PortfolioStore};
use bentofolio_layout::{ExportOptions, LayoutController, export_html, parse_declared_sizes};
use bentofolio_storage::JsonFileRepository;
use bentofolio_telemetry::UsageTracker;
use bentofolio_tools::default_registry;

// ── Mock Client ──────────────────────────────────────────────────────────

/// A model client that returns scripted replies in sequence.
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<ChatResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, i: usize) -> ChatRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait::async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let count = self.calls();
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => panic!("ScriptedClient exhausted at call #{count}"),
        }
    }
}

fn text(reply: &str) -> Result<ChatResponse, ProviderError> {
    Ok(ChatResponse {
        message: Message::assistant(reply),
        finish_reason: FinishReason::Stop,
        usage: Some(Usage { prompt_tokens: 300, completion_tokens: 20, total_tokens: 320 }),
        model: "gpt-4o-mini".into(),
    })
}

fn tools(calls: &[(&str, serde_json::Value)]) -> Result<ChatResponse, ProviderError> {
    let calls: Vec<MessageToolCall> = calls
        .iter()
        .enumerate()
        .map(|(i, (name, args))| MessageToolCall {
            id: format!("call_{name}_{i}"),
            name: name.to_string(),
            arguments: serde_json::to_string(args).unwrap(),
        })
        .collect();
    Ok(ChatResponse {
        message: Message::assistant("").with_tool_calls(calls),
        finish_reason: FinishReason::ToolCalls,
        usage: Some(Usage { prompt_tokens: 250, completion_tokens: 40, total_tokens: 290 }),
        model: "gpt-4o-mini".into(),
    })
}

fn agent(client: Arc<ScriptedClient>) -> ToolOrchestrator {
    ToolOrchestrator::new(Arc::new(default_registry()), Some(client))
}

// ── E2E: Chat → Save → Reload → Export ───────────────────────────────────

#[tokio::test]
async fn e2e_chat_builds_portfolio_that_survives_reload_and_export() {
    let client = ScriptedClient::new(vec![
        tools(&[("create_section", serde_json::json!({"title": "Work"}))]),
        tools(&[
            ("add_card", serde_json::json!({"sectionTitle": "Work", "width": 2, "height": 2})),
            ("add_card", serde_json::json!({"sectionTitle": "Work"})),
        ]),
        tools(&[(
            "update_card_text",
            serde_json::json!({"sectionTitle": "Work", "cardIndex": 0, "text": "Hello there", "title": "Intro"}),
        )]),
        text("Created a Work section with two cards."),
    ]);
    let store = PortfolioStore::default();

    let outcome = agent(client.clone())
        .run("Set up a Work section with a big intro card", &[], &store)
        .await
        .expect("turn should succeed");

    assert_eq!(outcome.final_text, "Created a Work section with two cards.");
    assert_eq!(outcome.tool_calls, 4);
    assert_eq!(outcome.iterations, 4);
    assert!(!outcome.hit_iteration_cap);
    assert_eq!(client.calls(), 4);

    // The prompt of the last call reflects every edit.
    let last_system = client.request(3).messages[0].content.clone();
    assert!(last_system.contains("Section 0: \"Work\" (2 cards)"), "{last_system}");
    assert!(last_system.contains("caption=\"Intro\""));

    let (sizes, intro) = store.read(|s| {
        let cards = &s.sections[0].cards;
        (
            cards.iter().map(|c| c.size).collect::<Vec<_>>(),
            cards[0].content.body.text().map(str::to_string),
        )
    });
    assert_eq!(sizes, vec![CardSize::new(2, 2), CardSize::unit()]);
    assert_eq!(intro.as_deref(), Some("Hello there"));

    // Persist, then reload into a fresh store.
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path());
    store.save_to(&repo, "ada").await.unwrap();
    assert!(!store.is_dirty());

    let reloaded = PortfolioStore::default();
    assert!(reloaded.load_from(&repo, "ada").await.unwrap());
    assert_eq!(reloaded.read(|s| s.sections.clone()), store.read(|s| s.sections.clone()));

    // Layout at a phone-ish width drops to two columns.
    let section = reloaded.read(|s| s.sections[0].clone());
    let config = reloaded.read(|s| s.grid_config);
    let mut controller = LayoutController::for_section(&section, config);
    let snapshot = controller.set_width(360.0);
    assert_eq!(snapshot.columns, 2);
    assert_eq!(snapshot.layout.total_rows(), 3);

    // The export declares exactly the stored sizes.
    let html = reloaded.read(|s| export_html(s, &ExportOptions::default()));
    let grids = parse_declared_sizes(&html);
    assert_eq!(grids.len(), 1);
    let declared: Vec<CardSize> = grids[0].cards.iter().map(|(_, size)| *size).collect();
    assert_eq!(declared, sizes);
    assert_eq!(grids[0].config, config);
}

// ── E2E: Failure handling ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_provider_failure_mid_turn_leaves_portfolio_untouched() {
    let client = ScriptedClient::new(vec![
        tools(&[("create_section", serde_json::json!({"title": "Photos"}))]),
        Err(ProviderError::Network("connection reset".into())),
    ]);
    let store = PortfolioStore::default();

    let err = agent(client).run("add a photos section", &[], &store).await.unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)));
    assert!(store.read(|s| s.sections.is_empty()));
    assert!(!store.is_dirty());
}

#[tokio::test]
async fn e2e_tool_errors_reach_the_model_in_user_terms() {
    let client = ScriptedClient::new(vec![
        tools(&[("create_section", serde_json::json!({"title": "Work"}))]),
        tools(&[("remove_card", serde_json::json!({"sectionTitle": "Work", "cardIndex": 3}))]),
        text("That section has no cards yet."),
    ]);
    let store = PortfolioStore::default();

    let outcome = agent(client.clone()).run("remove the 4th card", &[], &store).await.unwrap();
    assert_eq!(outcome.final_text, "That section has no cards yet.");

    let tool_message = client
        .request(2)
        .messages
        .into_iter()
        .filter(|m| m.role == Role::Tool)
        .last()
        .expect("tool result sent to the model");
    assert!(tool_message.content.contains("\"success\":false"), "{}", tool_message.content);
    // The section from the first call stays: tool failures don't roll back.
    assert_eq!(store.read(|s| s.sections.len()), 1);
}

// ── E2E: Multi-turn conversation ─────────────────────────────────────────

#[tokio::test]
async fn e2e_history_carries_across_turns() {
    let client = ScriptedClient::new(vec![
        tools(&[("set_bio_info", serde_json::json!({"name": "Ada Lovelace"}))]),
        text("Your bio now says Ada Lovelace."),
        tools(&[("set_bio_info", serde_json::json!({"description": "Analyst"}))]),
        text("Added a description."),
    ]);
    let store = PortfolioStore::default();
    let agent = agent(client.clone());

    let first = agent.run("my name is Ada Lovelace", &[], &store).await.unwrap();
    let second = agent
        .run("describe me as an analyst", &first.updated_history, &store)
        .await
        .unwrap();

    assert_eq!(second.final_text, "Added a description.");
    let (name, description) = store.read(|s| {
        let bio = s.bio.clone().unwrap_or_default();
        (bio.name, bio.description)
    });
    assert_eq!(name, "Ada Lovelace");
    assert_eq!(description, "Analyst");

    // The third call (first of turn two) sees turn one's exchange.
    let request = client.request(2);
    assert!(request.messages.iter().any(|m| m.content == "my name is Ada Lovelace"));
    assert!(request.messages.iter().any(|m| m.content == "Your bio now says Ada Lovelace."));
    assert_eq!(request.messages.last().map(|m| m.content.as_str()), Some("describe me as an analyst"));
    assert!(second.updated_history.len() > first.updated_history.len());
}

// ── E2E: Usage accounting persists ───────────────────────────────────────

#[tokio::test]
async fn e2e_usage_is_recorded_and_persisted() {
    let client = ScriptedClient::new(vec![
        tools(&[("list_sections", serde_json::json!({}))]),
        text("You have no sections yet."),
    ]);
    let store = PortfolioStore::default();
    let usage = Arc::new(UsageTracker::new());
    let agent = agent(client).with_usage(usage.clone());

    agent.run("what do I have?", &[], &store).await.unwrap();

    let today = usage.daily_usage("gpt-4o-mini");
    assert_eq!(today.used.requests, 2);
    assert_eq!(today.used.input_tokens, 550);
    assert_eq!(today.used.output_tokens, 60);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.json");
    usage.save(&path).unwrap();
    let restored = UsageTracker::load(&path).unwrap();
    assert_eq!(restored.daily_usage("gpt-4o-mini").used, today.used);
}
