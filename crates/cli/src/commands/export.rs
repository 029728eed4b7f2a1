//! `bentofolio export`: Write the stored portfolio as one HTML file.

use bentofolio_layout::{ExportOptions, export_html};
use std::path::Path;

pub async fn run(
    path: Option<&Path>,
    output: &Path,
    title: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path)?;
    let session = super::Session::open(&config).await?;
    if !session.found {
        println!("  No stored portfolio for \"{}\"; exporting an empty page.", config.storage.identity);
    }

    let html = session.store.read(|state| export_html(state, &ExportOptions { title }));
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(output, &html)?;

    let cards = session.store.read(|s| s.card_count());
    println!("  Exported {cards} cards to {} ({} bytes)", output.display(), html.len());
    println!("  Media under /assets/ is served from {}", config.storage.assets_dir.display());
    Ok(())
}
