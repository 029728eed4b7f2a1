//! `bentofolio layout`: Packed layout of every stored section.

use bentofolio_layout::{LayoutController, PackItem};
use std::path::Path;

pub async fn run(path: Option<&Path>, width: Option<f64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path)?;
    let session = super::Session::open(&config).await?;
    let state = session.store.state();

    if state.sections.is_empty() {
        println!("No sections yet. Add some with `bentofolio chat` or the editor.");
        return Ok(());
    }

    for section in &state.sections {
        let mut controller = LayoutController::for_section(section, state.grid_config);
        let mut snapshot = controller.sync_section(section);
        if let Some(width) = width {
            snapshot = controller.set_width(width);
        }

        println!("Section \"{}\" ({} cards)", section.title, section.cards.len());
        let items: Vec<PackItem> = section.cards.iter().map(PackItem::from).collect();
        let empty: Vec<_> = snapshot.add_slots.iter().map(|slot| slot.cell).collect();
        print!("{}", super::pack::describe(&items, &snapshot.layout, &empty));
        if snapshot.metrics.is_some() {
            println!("  Height: {:.0}px", snapshot.content_height());
        }
        println!();
    }
    Ok(())
}
