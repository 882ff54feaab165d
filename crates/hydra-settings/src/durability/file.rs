//! Well-known snapshot file on local storage

use std::path::{Path, PathBuf};

use crate::error::Result;

/// The single durability snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<directory>/<file_name>`, e.g. the app's private document directory.
    pub fn in_directory(directory: impl AsRef<Path>, file_name: &str) -> Self {
        Self::new(directory.as_ref().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Create the file (and its parent directories) if it is missing.
    pub async fn create(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if !self.exists().await {
            tokio::fs::write(&self.path, b"").await?;
        }
        Ok(())
    }

    /// Replace the file contents.
    ///
    /// Writes a sibling temp file first and renames it over the target so a
    /// crash mid-write leaves the previous snapshot intact.
    pub async fn write(&self, contents: &str) -> Result<()> {
        let mut temp_name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    pub async fn read_text(&self) -> Result<String> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}
