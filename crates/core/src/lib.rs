//! # Bentofolio Core
//!
//! Domain types, traits, and error definitions shared by every Bentofolio crate.
//! The portfolio model (sections, cards, bio) and the single serialized
//! mutation entry point live here, together with the collaborator traits the
//! rest of the workspace implements against.
//!
//! ## Layout
//!
//! - [`portfolio`] and [`action`]: the state tree and the reducer that mutates it
//! - [`store`] and [`history`]: serialized dispatch with snapshot undo/redo
//! - [`provider`], [`tool`], [`repository`]: collaborator contracts
//! - [`event`]: broadcast bus for cross-crate notifications

pub mod action;
pub mod error;
pub mod event;
pub mod history;
pub mod message;
pub mod portfolio;
pub mod provider;
pub mod repository;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use action::{Action, reduce};
pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use history::History;
pub use message::{Message, MessageToolCall, Role};
pub use portfolio::{
    Bio, BioBlock, BioUpdate, Card, CardBody, CardContent, CardKind, CardSize, ContentUpdate,
    GridConfig, MediaTransform, PortfolioState, Section, Snapshot,
};
pub use provider::{ChatRequest, ChatResponse, FinishReason, ModelClient, ToolDefinition, Usage};
pub use repository::{MediaStore, MediaUpload, PortfolioRepository, StoredMedia};
pub use store::{Checkpoint, PortfolioStore};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, validate_arguments};
