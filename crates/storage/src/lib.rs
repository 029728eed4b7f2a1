//! Persistence collaborators for Bentofolio.
//!
//! Portfolio documents go to a [`PortfolioRepository`](bentofolio_core::PortfolioRepository)
//! (a JSON file per identity, or memory for tests); images and videos go to a
//! content-addressed [`FileMediaStore`].

pub mod in_memory;
pub mod json_file;
pub mod media;

pub use in_memory::InMemoryRepository;
pub use json_file::JsonFileRepository;
pub use media::{
    FileMediaStore, InlineImage, decode_data_url, for_editor, from_editor, migrate_inline_media,
    store_uploads,
};
