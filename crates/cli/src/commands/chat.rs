//! `bentofolio chat`: Interactive or single-message editing through the
//! assistant. The portfolio is saved after every turn that changed it.

use bentofolio_agent::{ToolOrchestrator, TurnOutcome};
use bentofolio_config::AppConfig;
use bentofolio_core::event::EventBus;
use bentofolio_core::message::Message;
use bentofolio_storage::migrate_inline_media;
use bentofolio_telemetry::UsageTracker;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::Session;

pub async fn run(path: Option<&Path>, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path)?;

    let client = bentofolio_providers::build_from_config(&config).default();
    if client.is_none() {
        eprintln!();
        eprintln!("  No API key configured, so the assistant can't edit anything yet.");
        eprintln!("  Set BENTOFOLIO_API_KEY or GITHUB_TOKEN, or add api_key to:");
        eprintln!("    {}", super::config_file(path).display());
        eprintln!();
    }

    let usage = match UsageTracker::load(&config.storage.usage_file) {
        Ok(usage) => usage,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable usage file");
            UsageTracker::new()
        }
    };
    let agent = ToolOrchestrator::from_config(&config, client)
        .with_usage(Arc::new(usage))
        .with_events(Arc::new(EventBus::default()));
    let session = Session::open(&config).await?;

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let result = agent.run(&msg, &[], &session.store).await;
        eprint!("\r              \r");
        let outcome = result?;
        print_outcome(&outcome);
        persist(&config, &agent, &session).await?;
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Bentofolio assistant");
    println!("  --------------------");
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Portfolio: {} ({} sections)", config.storage.identity, session.store.read(|s| s.sections.len()));
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let result = agent.run(line, &history, &session.store).await;
        eprint!("\r     \r");
        match result {
            Ok(outcome) => {
                print_outcome(&outcome);
                history = outcome.updated_history;
                if let Err(e) = persist(&config, &agent, &session).await {
                    eprintln!("  [Save failed] {e}");
                }
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome) {
    println!();
    for line in outcome.final_text.lines() {
        println!("  Assistant > {line}");
    }
    for warning in &outcome.warnings {
        println!("  [Quota] {warning}");
    }
    if outcome.tool_calls > 0 {
        println!("  ({} tool calls in {} iterations)", outcome.tool_calls, outcome.iterations);
    }
    println!();
}

/// Save the portfolio when it has unsaved edits, and the usage counters.
async fn persist(
    config: &AppConfig,
    agent: &ToolOrchestrator,
    session: &Session,
) -> Result<(), Box<dyn std::error::Error>> {
    if session.store.is_dirty() {
        let mut state = session.store.state();
        if migrate_inline_media(&mut state, &session.media).await? > 0 {
            session.store.dispatch(bentofolio_core::Action::LoadState { state: Box::new(state) });
        }
        session.store.save_to(&session.repository, &config.storage.identity).await?;
    }
    agent.usage().save(&config.storage.usage_file)?;
    Ok(())
}
