use async_trait::async_trait;
use std::path::{Path, PathBuf};
use swarmer_core::{FileStore, SwarmError, SwarmResult};
use tracing::info;

/// Largest artifact accepted by [`LocalFileStore::persist`].
pub const MAX_ARTIFACT_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Reject names that could escape the store's directory.
///
/// Artifact names are flat: no separators, no `..`, no hidden files.
pub fn validate_name(name: &str) -> SwarmResult<()> {
    if name.trim().is_empty() {
        return Err(SwarmError::Storage("artifact name is empty".into()));
    }
    if name.contains(['/', '\\', '\0']) || name.contains("..") || name.starts_with('.') {
        return Err(SwarmError::Storage(format!(
            "invalid artifact name '{name}'"
        )));
    }
    Ok(())
}

/// `FileStore` over a single local directory, created on first write.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> SwarmResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn persist(&self, name: &str, content: &str) -> SwarmResult<()> {
        let path = self.path_for(name)?;
        if content.len() > MAX_ARTIFACT_SIZE {
            return Err(SwarmError::Storage(format!(
                "artifact '{name}' too large: {} bytes (max: {MAX_ARTIFACT_SIZE} bytes)",
                content.len()
            )));
        }
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, content).await?;
        info!(path = %path.display(), bytes = content.len(), "Artifact written");
        Ok(())
    }

    async fn read(&self, name: &str) -> SwarmResult<String> {
        let path = self.path_for(name)?;
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            SwarmError::Storage(format!("cannot read artifact '{name}': {e}"))
        })
    }

    async fn list(&self) -> SwarmResult<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
