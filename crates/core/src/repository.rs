//! Persistence and media collaborators.
//!
//! The core treats both as opaque services: it hands a whole
//! [`PortfolioState`] to a repository and stores whatever URL a media store
//! returns, never anything protocol-specific.

use async_trait::async_trait;
use crate::error::StoreError;
use crate::portfolio::PortfolioState;

/// Loads and saves whole portfolio documents keyed by an owner identity.
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    /// A human-readable name for logging (e.g., "json_file", "in_memory").
    fn name(&self) -> &str;

    /// `Ok(None)` means nothing has been stored for `identity` yet.
    async fn load(&self, identity: &str) -> Result<Option<PortfolioState>, StoreError>;

    async fn save(&self, identity: &str, state: &PortfolioState) -> Result<(), StoreError>;
}

/// Bytes handed to a media store.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    /// Original file name, used only to pick an extension.
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Media previously stored under a durable URL.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store the bytes and return the durable URL to reference them by.
    async fn put(&self, upload: MediaUpload) -> Result<String, StoreError>;

    /// Fetch media by the path component of a URL returned from [`put`](Self::put).
    async fn get(&self, path: &str) -> Result<Option<StoredMedia>, StoreError>;
}
