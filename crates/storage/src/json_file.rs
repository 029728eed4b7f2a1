//! JSON file repository: one pretty-printed document per owner identity.
//!
//! Storage location: `<data_dir>/<identity>.json`
//!
//! Writes go to a sibling `.tmp` file that is renamed over the target, so a
//! crash mid-write never leaves a truncated document behind.

use async_trait::async_trait;
use bentofolio_core::error::StoreError;
use bentofolio_core::portfolio::PortfolioState;
use bentofolio_core::repository::PortfolioRepository;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Document path for `identity`. Anything outside `[A-Za-z0-9_-]` is
    /// replaced so an identity can never escape the data directory.
    pub fn path_for(&self, identity: &str) -> PathBuf {
        let mut name: String = identity
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if name.is_empty() {
            name.push_str("default");
        }
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl PortfolioRepository for JsonFileRepository {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn load(&self, identity: &str) -> Result<Option<PortfolioState>, StoreError> {
        let path = self.path_for(identity);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No portfolio document yet");
                return Ok(None);
            }
            Err(e) => {
                return Err(StoreError::Load(format!("Failed to read {}: {e}", path.display())));
            }
        };

        let state = serde_json::from_str(&content)
            .map_err(|e| StoreError::Load(format!("Failed to parse {}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = content.len(), "Portfolio document loaded");
        Ok(Some(state))
    }

    async fn save(&self, identity: &str, state: &PortfolioState) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Save(format!("Failed to create data directory: {e}")))?;

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Save(format!("Failed to serialize portfolio: {e}")))?;

        let path = self.path_for(identity);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &content)
            .await
            .map_err(|e| StoreError::Save(format!("Failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Save(format!("Failed to replace {}: {e}", path.display())))?;

        debug!(path = %path.display(), bytes = content.len(), "Portfolio document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bentofolio_core::{Action, CardSize, PortfolioStore};

    #[tokio::test]
    async fn missing_document_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path());
        assert!(repo.load("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_and_reload_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("data"));

        let store = PortfolioStore::default();
        store.dispatch(Action::add_section("Work"));
        let section_id = store.read(|s| s.sections[0].id.clone());
        store.dispatch(Action::add_card(section_id, CardSize::new(2, 1)));
        let saved_at = store.save_to(&repo, "ada").await.unwrap();
        assert!(!store.is_dirty());

        let raw = std::fs::read_to_string(repo.path_for("ada")).unwrap();
        assert!(raw.contains("\"bento\": \"2x1\""));
        assert!(raw.contains("savedAt"));
        assert!(!repo.path_for("ada").with_extension("json.tmp").exists());

        let fresh = PortfolioStore::default();
        assert!(fresh.load_from(&repo, "ada").await.unwrap());
        assert_eq!(fresh.read(|s| s.card_count()), 1);
        assert_eq!(fresh.read(|s| s.saved_at), Some(saved_at));
    }

    #[tokio::test]
    async fn corrupt_document_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path());
        std::fs::write(repo.path_for("ada"), "{ not json").unwrap();
        assert!(matches!(repo.load("ada").await, Err(StoreError::Load(_))));
    }

    #[test]
    fn identities_cannot_escape_the_directory() {
        let repo = JsonFileRepository::new("/data");
        assert_eq!(repo.path_for("../etc/passwd"), PathBuf::from("/data/___etc_passwd.json"));
        assert_eq!(repo.path_for(""), PathBuf::from("/data/default.json"));
    }
}
