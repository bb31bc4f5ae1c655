//! Documents in a local directory

use super::{StateStore, decode_document, document_key};
use crate::error::RotateError;
use anyhow::{Context, Result};
use rds_rotate_common::RotationState;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Directory-backed store, one `<name>.yml` file per deployment
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    dir: PathBuf,
}

impl LocalStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(document_key(name))
    }
}

impl StateStore for LocalStateStore {
    async fn load(&self, name: &str) -> Result<RotationState> {
        let path = self.path(name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RotateError::StateNotFound {
                    key: document_key(name),
                }
                .into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        decode_document(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Writes a temp file and renames it over the document.
    async fn save(&self, name: &str, state: &RotationState) -> Result<()> {
        let yaml = state.to_yaml().map_err(RotateError::Configuration)?;
        let path = self.path(name);
        let tmp = self.dir.join(format!(".{}.tmp", document_key(name)));

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let mut file = fs::File::create(&tmp)
            .await
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(yaml.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move {} into place", path.display()))?;

        debug!(path = %path.display(), "Saved rotation document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rds_rotate_common::Slot;

    fn sample() -> RotationState {
        RotationState {
            source_identifier: "orders-prod".into(),
            target_base_identifier: "orders-replica".into(),
            current: Slot::new("orders-replica-20240314", "a.example.com"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStateStore::new(dir.path());

        store.save("orders", &sample()).await.unwrap();
        assert!(dir.path().join("orders.yml").exists());
        assert!(!dir.path().join(".orders.yml.tmp").exists());

        let loaded = store.load("orders").await.unwrap();
        assert_eq!(loaded, sample());
    }

    #[tokio::test]
    async fn test_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStateStore::new(dir.path());

        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(
            RotateError::find(&err),
            Some(RotateError::StateNotFound { key }) if key == "nope.yml"
        ));
    }

    #[tokio::test]
    async fn test_save_overwrites_and_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStateStore::new(dir.path().join("nested"));

        store.save("orders", &sample()).await.unwrap();
        let mut updated = sample();
        updated.previous = updated.current.clone();
        updated.current = Slot::new("orders-replica-20240315", "b.example.com");
        store.save("orders", &updated).await.unwrap();

        assert_eq!(store.load("orders").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yml"), "current: [1, 2").unwrap();
        let store = LocalStateStore::new(dir.path());

        let err = store.load("bad").await.unwrap_err();
        assert!(matches!(
            RotateError::find(&err),
            Some(RotateError::Configuration(_))
        ));
    }
}
