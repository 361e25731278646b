use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{validate_key, BlobStore, ObjectMetadata, StoredObject};
use crate::Result;

const METADATA_SUFFIX: &str = ".meta.json";

/// Directory-backed blob store.
///
/// Each object is a file under `root`; its metadata lives in a JSON sidecar
/// named `<file>.meta.json`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn metadata_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(METADATA_SUFFIX);
        PathBuf::from(name)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let path = self.object_path(key)?;

        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key = %key, "Object not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let metadata = match tokio::fs::read(Self::metadata_path(&path)).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "Ignoring unreadable object metadata");
                ObjectMetadata::default()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => ObjectMetadata::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(StoredObject {
            key: key.to_string(),
            body,
            metadata,
        }))
    }

    async fn put(&self, key: &str, body: Vec<u8>, metadata: ObjectMetadata) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let size = body.len();
        tokio::fs::write(&path, body).await?;
        tokio::fs::write(Self::metadata_path(&path), serde_json::to_vec(&metadata)?).await?;

        debug!(key = %key, size, "Object written");
        Ok(())
    }
}
