//! `bentofolio status`: Show configuration, storage and quota status.

use bentofolio_telemetry::{DailyUsage, UsageTracker};
use std::path::Path;

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path)?;
    let session = super::Session::open(&config).await?;

    println!("Bentofolio Status");
    println!("=================");
    println!("  Config:       {}", super::config_file(path).display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Selection:    {}", if config.agent.smart_selection { config.agent.selection_mode.as_str() } else { "off" });
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!("  Data dir:     {}", config.storage.data_dir.display());
    println!("  Assets dir:   {}", config.storage.assets_dir.display());

    println!();
    if session.found {
        let (sections, cards, saved_at) =
            session.store.read(|s| (s.sections.len(), s.card_count(), s.saved_at));
        println!("  Portfolio \"{}\": {sections} sections, {cards} cards", config.storage.identity);
        if let Some(saved_at) = saved_at {
            println!("  Last saved:   {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    } else {
        println!("  No stored portfolio for \"{}\"", config.storage.identity);
    }

    let usage = UsageTracker::load(&config.storage.usage_file)?;
    let mut report = usage.report();
    if !report.iter().any(|u| u.model == config.default_model) {
        report.push(usage.daily_usage(&config.default_model));
    }
    println!();
    println!("  Today's usage:");
    for line in report.iter().map(usage_line) {
        println!("    {line}");
    }

    if !super::config_file(path).exists() {
        println!("\n  No config file; run `bentofolio init` first");
    }

    Ok(())
}

pub fn usage_line(usage: &DailyUsage) -> String {
    format!(
        "{:<24} {}/{} requests, {}/{} input tokens, {}/{} output tokens",
        usage.model,
        usage.used.requests,
        usage.limit.requests,
        usage.used.input_tokens,
        usage.limit.input_tokens,
        usage.used.output_tokens,
        usage.limit.output_tokens
    )
}
