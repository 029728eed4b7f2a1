//! Portfolio tools for the Bentofolio agent.
//!
//! Each tool resolves its target by title or index, validates positions, and
//! mutates the portfolio through exactly one store action. Failures come back
//! as `{ success: false, error }` results whose message names the valid
//! alternatives so the model can correct itself on the next iteration.

pub mod bio;
pub mod card;
pub mod resolve;
pub mod section;

use bentofolio_core::tool::ToolRegistry;

/// Create a registry holding every section, card, and bio tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Box::new(section::CreateSectionTool));
    registry.register(Box::new(section::DeleteSectionTool));
    registry.register(Box::new(section::RenameSectionTool));
    registry.register(Box::new(section::ReorderSectionTool));
    registry.register(Box::new(section::ListSectionsTool));

    registry.register(Box::new(card::AddCardTool));
    registry.register(Box::new(card::RemoveCardTool));
    registry.register(Box::new(card::ResizeCardTool));
    registry.register(Box::new(card::UpdateCardCaptionTool));
    registry.register(Box::new(card::UpdateCardTextTool));
    registry.register(Box::new(card::UpdateCardLinkTool));
    registry.register(Box::new(card::ListCardsTool));
    registry.register(Box::new(card::MoveCardTool));
    registry.register(Box::new(card::MoveCardToSectionTool));

    registry.register(Box::new(bio::SetBioInfoTool));
    registry.register(Box::new(bio::AddBioBlockTool));
    registry.register(Box::new(bio::UpdateBioBlockTool));
    registry.register(Box::new(bio::RemoveBioBlockTool));
    registry.register(Box::new(bio::ClearBioTool));
    registry.register(Box::new(bio::GetBioTool));

    registry
}
