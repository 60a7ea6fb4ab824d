//! Local filesystem storage for attachments
//!
//! All attachments share one directory; each file name embeds the record id
//! (`{id}__{name}`), so concurrent writers never touch the same file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;
use tracing::{debug, info};

use super::{BoxReader, FileStorage};
use crate::core::error::{AppError, Result};

/// Marker file dropped into the attachments directory
pub const ACCESS_DENY_MARKER_FILE: &str = ".htaccess";

/// Deny-all rule for static servers that honour `.htaccess`
pub const ACCESS_DENY_MARKER: &str = "Order allow,deny\nDeny from all\n";

/// Attachment storage rooted at a single private directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Create a storage rooted at `base_dir`, resolved to an absolute path
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = std::path::absolute(base_dir.as_ref()).map_err(|e| {
            AppError::Storage(format!(
                "Failed to resolve attachments directory {}: {}",
                base_dir.as_ref().display(),
                e
            ))
        })?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            AppError::Storage(format!(
                "create_dir_all failed for {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let marker = self.base_dir.join(ACCESS_DENY_MARKER_FILE);
        if !fs::try_exists(&marker).await.unwrap_or(false) {
            fs::write(&marker, ACCESS_DENY_MARKER).await.map_err(|e| {
                AppError::Storage(format!(
                    "Failed to write access-deny marker {}: {}",
                    marker.display(),
                    e
                ))
            })?;
            info!("Access-deny marker created at {}", marker.display());
        }

        Ok(())
    }

    fn path_for(&self, stored_name: &str) -> PathBuf {
        self.base_dir.join(stored_name)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        fs::write(path, data).await.map_err(|e| {
            AppError::Storage(format!("write failed for {}: {}", path.display(), e))
        })?;

        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    async fn file_size(&self, path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path).await.map_err(|e| {
            AppError::Storage(format!("stat failed for {}: {}", path.display(), e))
        })?;

        Ok(metadata.len())
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("File already absent: {}", path.display());
                Ok(())
            }
            Err(e) => Err(AppError::Storage(format!(
                "remove failed for {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn open(&self, path: &Path) -> Result<BoxReader> {
        match fs::File::open(path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound("Attachment file not found".to_string()))
            }
            Err(e) => Err(AppError::Storage(format!(
                "open failed for {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
