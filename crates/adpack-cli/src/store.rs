//! Filesystem-backed creative store.

use std::io;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use adpack_core::services::CreativeStore;
use async_trait::async_trait;
use tracing::debug;

/// Writes creatives to `<root>/<upload_id>/<relative_path>`.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory holding every file of `upload_id`.
    pub fn upload_dir(&self, upload_id: &str) -> PathBuf {
        self.root.join(upload_id)
    }

    fn target(&self, upload_id: &str, relative_path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(relative_path);
        let plain = |path: &Path| path.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain(Path::new(upload_id)) || !plain(relative) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to store outside the output directory: {upload_id}/{relative_path}"),
            ));
        }
        Ok(self.upload_dir(upload_id).join(relative))
    }
}

#[async_trait]
impl CreativeStore for DirStore {
    async fn put(&self, upload_id: &str, relative_path: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.target(upload_id, relative_path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        debug!(target: "adpack::store", path = %target.display(), bytes = bytes.len(), "stored");
        Ok(())
    }
}
