// src/storage/local.rs

//! Local filesystem watermark store.
//!
//! One JSON file maps community base URLs to their watermarks:
//!
//! ```text
//! {
//!   "avatar.fandom.com/de": { "last": "2024-05-01T12:33:45Z" },
//!   "disney.fandom.com":    { "last": "" }
//! }
//! ```
//!
//! The file is small and rewritten whole on every update. Writes go to a
//! temp file first and are renamed into place, so a crash mid-write leaves
//! the previous file intact. An internal mutex serializes read-modify-write
//! sequences; one store instance must own the file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{FandomError, Result};
use crate::models::Community;
use crate::storage::{Watermark, WatermarkStore};

/// Watermark store backed by a single JSON file.
pub struct LocalWatermarkStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl LocalWatermarkStore {
    /// Create a store writing to the given file path.
    ///
    /// The file and its parent directory are created lazily on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Watermark>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(FandomError::Io(e)),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, Watermark>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl WatermarkStore for LocalWatermarkStore {
    async fn load(&self, community: &Community) -> Result<Watermark> {
        let _lock = self.guard.lock().await;
        let entries = self.read_all().await?;
        Ok(entries
            .get(&community.base_url)
            .copied()
            .unwrap_or_default())
    }

    async fn save(&self, community: &Community, watermark: &Watermark) -> Result<()> {
        let _lock = self.guard.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(community.base_url.clone(), *watermark);
        self.write_all(&entries).await
    }

    async fn ensure(&self, community: &Community) -> Result<Watermark> {
        let _lock = self.guard.lock().await;
        let mut entries = self.read_all().await?;
        if let Some(existing) = entries.get(&community.base_url) {
            return Ok(*existing);
        }
        let empty = Watermark::default();
        entries.insert(community.base_url.clone(), empty);
        self.write_all(&entries).await?;
        Ok(empty)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::models::SiteInfo;

    fn make_community(base_url: &str) -> Community {
        Community::new(base_url, SiteInfo::default()).unwrap()
    }

    fn make_store(dir: &TempDir) -> LocalWatermarkStore {
        LocalWatermarkStore::new(dir.path().join("watermarks.json"))
    }

    #[tokio::test]
    async fn test_load_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        let community = make_community("test.fandom.com");

        let mark = store.load(&community).await.unwrap();
        assert_eq!(mark.last, None);
        assert!(!dir.path().join("watermarks.json").exists());
    }

    #[tokio::test]
    async fn test_ensure_creates_empty_entry_once() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        let community = make_community("test.fandom.com");

        let mark = store.ensure(&community).await.unwrap();
        assert_eq!(mark.last, None);
        let content =
            std::fs::read_to_string(dir.path().join("watermarks.json")).unwrap();
        assert!(content.contains("test.fandom.com"));
        assert!(content.contains(r#""last": """#));

        // A second ensure keeps the stored value.
        let instant = Utc.timestamp_opt(1_714_564_800, 0).single().unwrap();
        store
            .save(&community, &Watermark { last: Some(instant) })
            .await
            .unwrap();
        let kept = store.ensure(&community).await.unwrap();
        assert_eq!(kept.last, Some(instant));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        let community = make_community("test.fandom.com");
        let instant = Utc.timestamp_opt(1_714_564_800, 0).single().unwrap();

        store
            .save(&community, &Watermark { last: Some(instant) })
            .await
            .unwrap();
        let mark = store.load(&community).await.unwrap();
        assert_eq!(mark.last, Some(instant));
    }

    #[tokio::test]
    async fn test_communities_are_tracked_separately() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        let english = make_community("avatar.fandom.com");
        let german = make_community("avatar.fandom.com/de");
        let instant = Utc.timestamp_opt(1_714_564_800, 0).single().unwrap();

        store
            .save(&english, &Watermark { last: Some(instant) })
            .await
            .unwrap();
        store.ensure(&german).await.unwrap();

        assert_eq!(store.load(&english).await.unwrap().last, Some(instant));
        assert_eq!(store.load(&german).await.unwrap().last, None);
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        let community = make_community("test.fandom.com");

        store.save(&community, &Watermark::default()).await.unwrap();
        assert!(dir.path().join("watermarks.json").exists());
        assert!(!dir.path().join("watermarks.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_surfaces_as_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watermarks.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let store = LocalWatermarkStore::new(path);
        let community = make_community("test.fandom.com");

        assert!(store.load(&community).await.is_err());
    }
}
