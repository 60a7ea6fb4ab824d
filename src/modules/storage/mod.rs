//! Storage module for attachment bytes
//!
//! Provides a private, non web-servable directory for attachment files.
//! Files are only ever served through the signed download handler.

mod local_storage;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::core::error::Result;

pub use local_storage::{LocalStorage, ACCESS_DENY_MARKER, ACCESS_DENY_MARKER_FILE};

/// Readable byte stream for a stored file
pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// File system operations the attachment store relies on
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Create the storage directory (and its access-deny marker) if absent
    async fn ensure_dir(&self) -> Result<()>;

    /// Absolute location for a stored file name
    fn path_for(&self, stored_name: &str) -> PathBuf;

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    async fn file_size(&self, path: &Path) -> Result<u64>;

    async fn exists(&self, path: &Path) -> bool;

    /// Delete a file. A file that is already gone is not an error.
    async fn remove(&self, path: &Path) -> Result<()>;

    async fn open(&self, path: &Path) -> Result<BoxReader>;
}
