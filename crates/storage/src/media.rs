//! Content-addressed media files and inline-media migration.
//!
//! Uploaded bytes are stored as `<assets_dir>/<sha256 prefix>.<ext>` and
//! referenced from the portfolio by the durable URL `/assets/<file>`. The
//! same bytes always map to the same file, so re-saving a portfolio never
//! duplicates media.
//!
//! The editor sees assets under `/api/assets/...`; [`for_editor`] and
//! [`from_editor`] translate between the two URL spaces.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bentofolio_core::error::StoreError;
use bentofolio_core::portfolio::{CardBody, PortfolioState};
use bentofolio_core::repository::{MediaStore, MediaUpload, StoredMedia};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ASSETS_URL_PREFIX: &str = "/assets/";
pub const EDITOR_ASSETS_URL_PREFIX: &str = "/api/assets/";

/// Hex characters of the digest kept in the file name.
const HASH_PREFIX_LEN: usize = 16;

pub struct FileMediaStore {
    dir: PathBuf,
}

impl FileMediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a request path (`abc.png`, `/assets/abc.png`, `/api/assets/abc.png`)
    /// to a file inside the assets directory. Nested paths are refused.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let name = path
            .strip_prefix(EDITOR_ASSETS_URL_PREFIX)
            .or_else(|| path.strip_prefix(ASSETS_URL_PREFIX))
            .unwrap_or(path)
            .trim_start_matches('/');
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        valid.then(|| self.dir.join(name))
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// File extension for a MIME type, falling back to the upload's file name.
pub fn extension_for(content_type: &str, file_name: Option<&str>) -> String {
    let from_type = match content_type.split(';').next().unwrap_or("").trim() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        _ => None,
    };
    if let Some(ext) = from_type {
        return ext.to_string();
    }
    file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase().replace("jpeg", "jpg"))
        .unwrap_or_else(|| "bin".to_string())
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl MediaStore for FileMediaStore {
    async fn put(&self, upload: MediaUpload) -> Result<String, StoreError> {
        let hash = content_hash(&upload.bytes);
        let ext = extension_for(&upload.content_type, upload.file_name.as_deref());
        let file_name = format!("{}.{ext}", &hash[..HASH_PREFIX_LEN]);
        let path = self.dir.join(&file_name);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(file = %file_name, "Media already stored");
        } else {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| StoreError::Media(format!("Failed to create assets directory: {e}")))?;
            tokio::fs::write(&path, &upload.bytes)
                .await
                .map_err(|e| StoreError::Media(format!("Failed to write {file_name}: {e}")))?;
            debug!(file = %file_name, bytes = upload.bytes.len(), "Media stored");
        }

        Ok(format!("{ASSETS_URL_PREFIX}{file_name}"))
    }

    async fn get(&self, path: &str) -> Result<Option<StoredMedia>, StoreError> {
        let Some(file) = self.resolve(path) else {
            return Ok(None);
        };
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(Some(StoredMedia {
                content_type: content_type_for(&file).to_string(),
                bytes,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Media(format!("Failed to read {}: {e}", file.display()))),
        }
    }
}

/// Decode a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Option<MediaUpload> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let content_type = meta.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload.trim()).ok()?;
    Some(MediaUpload {
        file_name: None,
        content_type: if content_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            content_type.to_string()
        },
        bytes,
    })
}

/// An image sent alongside a save, keyed by the placeholder URL the state
/// uses for it (typically a browser `blob:` URL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineImage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    /// Base64 payload without a `data:` header.
    pub data: String,
}

impl InlineImage {
    fn to_upload(&self) -> Result<MediaUpload, StoreError> {
        let bytes = BASE64
            .decode(self.data.trim())
            .map_err(|e| StoreError::Media(format!("Invalid base64 image data: {e}")))?;
        Ok(MediaUpload {
            file_name: self.name.clone(),
            content_type: self.content_type.clone(),
            bytes,
        })
    }
}

/// Visit every media URL in the state: card images and videos, and the bio
/// avatar.
fn media_urls_mut(state: &mut PortfolioState) -> Vec<&mut String> {
    let mut urls = Vec::new();
    for section in &mut state.sections {
        for card in &mut section.cards {
            match &mut card.content.body {
                CardBody::Image { image_url } => urls.push(image_url),
                CardBody::Video { video_url } => urls.push(video_url),
                CardBody::Text { .. } => {}
            }
        }
    }
    if let Some(bio) = &mut state.bio {
        urls.push(&mut bio.avatar);
    }
    urls
}

/// Store uploaded images and point the state at their durable URLs.
/// URLs without an upload are left as-is. Returns how many were replaced.
pub async fn store_uploads(
    state: &mut PortfolioState,
    images: &HashMap<String, InlineImage>,
    media: &dyn MediaStore,
) -> Result<usize, StoreError> {
    let mut durable = HashMap::new();
    for (placeholder, image) in images {
        let url = media.put(image.to_upload()?).await?;
        durable.insert(placeholder.as_str(), url);
    }

    let mut replaced = 0;
    for url in media_urls_mut(state) {
        if let Some(target) = durable.get(url.as_str()) {
            *url = target.clone();
            replaced += 1;
        }
    }
    Ok(replaced)
}

/// Move every `data:` URL in the state into the media store.
///
/// Runs before each save so persisted documents only reference durable
/// URLs. Returns how many URLs were migrated.
pub async fn migrate_inline_media(
    state: &mut PortfolioState,
    media: &dyn MediaStore,
) -> Result<usize, StoreError> {
    let mut migrated = 0;
    for url in media_urls_mut(state) {
        if !url.starts_with("data:") {
            continue;
        }
        let Some(upload) = decode_data_url(url) else {
            return Err(StoreError::Media("Malformed data URL in portfolio".into()));
        };
        *url = media.put(upload).await?;
        migrated += 1;
    }
    if migrated > 0 {
        info!(migrated, "Migrated inline media to durable URLs");
    }
    Ok(migrated)
}

/// Copy of the state with `/assets/...` URLs rewritten to `/api/assets/...`.
pub fn for_editor(state: &PortfolioState) -> PortfolioState {
    let mut clone = state.clone();
    for url in media_urls_mut(&mut clone) {
        if let Some(rest) = url.strip_prefix(ASSETS_URL_PREFIX) {
            *url = format!("{EDITOR_ASSETS_URL_PREFIX}{rest}");
        }
    }
    clone
}

/// Inverse of [`for_editor`], applied to state the editor sends back.
pub fn from_editor(state: &mut PortfolioState) {
    for url in media_urls_mut(state) {
        if let Some(rest) = url.strip_prefix(EDITOR_ASSETS_URL_PREFIX) {
            *url = format!("{ASSETS_URL_PREFIX}{rest}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bentofolio_core::{Bio, Card, CardSize, Section};

    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn state_with_image(url: &str) -> PortfolioState {
        let mut card = Card::new("c1", CardSize::unit(), "#fde2e4");
        card.content.body = CardBody::Image { image_url: url.to_string() };
        let mut section = Section::new("s1", "Work");
        section.cards.push(card);
        PortfolioState {
            sections: vec![section],
            bio: Some(Bio { avatar: format!("data:image/png;base64,{PIXEL_PNG}"), ..Bio::default() }),
            ..PortfolioState::default()
        }
    }

    fn image_url(state: &PortfolioState) -> &str {
        match &state.sections[0].cards[0].content.body {
            CardBody::Image { image_url } => image_url,
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn data_url_decoding() {
        let upload = decode_data_url(&format!("data:image/png;base64,{PIXEL_PNG}")).unwrap();
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(&upload.bytes[1..4], b"PNG");
        assert!(decode_data_url("https://example.com/a.png").is_none());
        assert!(decode_data_url("data:text/plain,hello").is_none());
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_for("image/jpeg", None), "jpg");
        assert_eq!(extension_for("application/octet-stream", Some("clip.MP4")), "mp4");
        assert_eq!(extension_for("", Some("photo.jpeg")), "jpg");
        assert_eq!(extension_for("", None), "bin");
    }

    #[tokio::test]
    async fn put_is_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let media = FileMediaStore::new(dir.path());
        let upload = MediaUpload {
            file_name: None,
            content_type: "image/png".into(),
            bytes: b"same bytes".to_vec(),
        };
        let first = media.put(upload.clone()).await.unwrap();
        let second = media.put(upload).await.unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("/assets/"));
        assert!(first.ends_with(".png"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let stored = media.get(&first).await.unwrap().unwrap();
        assert_eq!(stored.bytes, b"same bytes");
        assert_eq!(stored.content_type, "image/png");
    }

    #[tokio::test]
    async fn get_refuses_traversal_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let media = FileMediaStore::new(dir.path());
        assert!(media.get("../secret.txt").await.unwrap().is_none());
        assert!(media.get("/api/assets/nested/file.png").await.unwrap().is_none());
        assert!(media.get("missing.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn migration_replaces_inline_media() {
        let dir = tempfile::tempdir().unwrap();
        let media = FileMediaStore::new(dir.path());
        let mut state = state_with_image(&format!("data:image/png;base64,{PIXEL_PNG}"));

        let migrated = migrate_inline_media(&mut state, &media).await.unwrap();
        assert_eq!(migrated, 2);
        assert!(image_url(&state).starts_with("/assets/"));
        // Identical bytes share one file.
        assert_eq!(state.bio.as_ref().unwrap().avatar, image_url(&state));

        assert_eq!(migrate_inline_media(&mut state, &media).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn uploads_replace_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let media = FileMediaStore::new(dir.path());
        let mut state = state_with_image("blob:http://localhost/1234");
        let images = HashMap::from([(
            "blob:http://localhost/1234".to_string(),
            InlineImage { name: Some("me".into()), content_type: "image/png".into(), data: PIXEL_PNG.into() },
        )]);

        assert_eq!(store_uploads(&mut state, &images, &media).await.unwrap(), 1);
        assert!(image_url(&state).starts_with("/assets/"));
    }

    #[test]
    fn editor_urls_round_trip() {
        let state = state_with_image("/assets/abc.png");
        let mut editor = for_editor(&state);
        assert_eq!(image_url(&editor), "/api/assets/abc.png");
        from_editor(&mut editor);
        assert_eq!(image_url(&editor), "/assets/abc.png");
    }
}
