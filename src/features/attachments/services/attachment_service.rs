//! Attachment store for orders
//!
//! The list of records lives in one order metadata slot; the bytes live in
//! private storage. Every mutation is read-modify-write of the whole list, so
//! two concurrent writers on the same order can lose one another's change.
//! Callers that need stronger guarantees must serialize writes per order.

use std::path::Path;
use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::attachments::models::{
    decode_attachment_list, encode_attachment_list, AttachmentRecord,
};
use crate::features::orders::models::Order;
use crate::features::orders::OrderRepository;
use crate::modules::storage::{BoxReader, FileStorage};
use crate::shared::constants::{ATTACHMENTS_META_KEY, DEFAULT_MIME_TYPE};
use crate::shared::filename::{sanitize_filename, stored_file_name};

/// Service for managing order attachments
pub struct AttachmentService {
    orders: Arc<dyn OrderRepository>,
    storage: Arc<dyn FileStorage>,
    clock: Arc<dyn Clock>,
    max_upload_size: usize,
}

impl AttachmentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        storage: Arc<dyn FileStorage>,
        clock: Arc<dyn Clock>,
        max_upload_size: usize,
    ) -> Self {
        Self {
            orders,
            storage,
            clock,
            max_upload_size,
        }
    }

    /// All records of an order, in insertion order
    pub async fn list_attachments(&self, order: &Order) -> Result<Vec<AttachmentRecord>> {
        let raw = self.orders.get_meta(order, ATTACHMENTS_META_KEY).await?;
        Ok(decode_attachment_list(raw))
    }

    /// Store `bytes` as a new attachment of `order`.
    ///
    /// Nothing is left behind on failure: a written file whose record could
    /// not be persisted is removed again.
    pub async fn add_attachment(
        &self,
        order: &Order,
        filename: &str,
        bytes: &[u8],
        mime_hint: Option<&str>,
        uploaded_by: i64,
    ) -> Result<AttachmentRecord> {
        if bytes.len() > self.max_upload_size {
            return Err(AppError::Validation(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                self.max_upload_size,
                self.max_upload_size / 1024 / 1024
            )));
        }

        let name = sanitize_filename(filename);
        let mime = resolve_mime(mime_hint, &name);

        self.storage.ensure_dir().await?;

        let id = Uuid::new_v4().to_string();
        let path = self.storage.path_for(&stored_file_name(&id, &name));

        if let Err(e) = self.storage.write(&path, bytes).await {
            self.discard_file(&path).await;
            return Err(e);
        }

        let size = match self.storage.file_size(&path).await {
            Ok(size) => size,
            Err(e) => {
                self.discard_file(&path).await;
                return Err(e);
            }
        };
        if size != bytes.len() as u64 {
            self.discard_file(&path).await;
            return Err(AppError::Storage(format!(
                "Short write for {}: expected {} bytes, found {}",
                path.display(),
                bytes.len(),
                size
            )));
        }

        let record = AttachmentRecord {
            id,
            name,
            path: path.clone(),
            mime,
            size,
            uploaded_at: self.clock.utc(),
            uploaded_by,
        };

        let persisted = async {
            let mut records = self.list_attachments(order).await?;
            records.push(record.clone());
            self.save(order, &records).await
        }
        .await;

        if let Err(e) = persisted {
            self.discard_file(&path).await;
            return Err(e);
        }

        info!(
            "Attachment {} ({}, {} bytes) added to order {} by user {}",
            record.id, record.name, record.size, order.id, uploaded_by
        );

        Ok(record)
    }

    /// Remove one record and its file. Returns `false` when no record has that id.
    ///
    /// The list is persisted before the file is deleted, so a failed persist
    /// never leaves a record pointing at a missing file. A file that cannot be
    /// deleted is only logged.
    pub async fn remove_attachment(&self, order: &Order, attachment_id: &str) -> Result<bool> {
        let mut records = self.list_attachments(order).await?;

        let Some(index) = records.iter().position(|r| r.id == attachment_id) else {
            debug!(
                "Attachment {} not found on order {}; nothing to remove",
                attachment_id, order.id
            );
            return Ok(false);
        };

        let removed = records.remove(index);
        self.save(order, &records).await?;

        if removed.path.as_os_str().is_empty() {
            warn!(
                "Attachment {} on order {} had no stored path",
                removed.id, order.id
            );
        } else if let Err(e) = self.storage.remove(&removed.path).await {
            warn!(
                "Attachment {} removed from order {} but its file could not be deleted: {}",
                removed.id, order.id, e
            );
        }

        info!("Attachment {} removed from order {}", removed.id, order.id);

        Ok(true)
    }

    /// The record with `attachment_id`, if the order has one
    pub async fn resolve_attachment(
        &self,
        order: &Order,
        attachment_id: &str,
    ) -> Result<Option<AttachmentRecord>> {
        let records = self.list_attachments(order).await?;
        Ok(records.into_iter().find(|r| r.id == attachment_id))
    }

    /// Whether the bytes behind a record are still present
    pub async fn file_exists(&self, record: &AttachmentRecord) -> bool {
        !record.path.as_os_str().is_empty() && self.storage.exists(&record.path).await
    }

    /// Open the bytes behind a record, returning the reader and the size on disk
    pub async fn open_file(&self, record: &AttachmentRecord) -> Result<(BoxReader, u64)> {
        let size = self.storage.file_size(&record.path).await?;
        let reader = self.storage.open(&record.path).await?;
        Ok((reader, size))
    }

    async fn save(&self, order: &Order, records: &[AttachmentRecord]) -> Result<()> {
        self.orders
            .update_meta(order, ATTACHMENTS_META_KEY, encode_attachment_list(records))
            .await
    }

    async fn discard_file(&self, path: &Path) {
        if let Err(e) = self.storage.remove(path).await {
            warn!("Failed to clean up {}: {}", path.display(), e);
        }
    }
}

/// Client hint when it is specific and well-formed, otherwise a guess from the extension.
fn resolve_mime(hint: Option<&str>, name: &str) -> String {
    let hint = hint
        .map(str::trim)
        .filter(|h| !h.is_empty() && *h != DEFAULT_MIME_TYPE)
        .filter(|h| h.contains('/') && !h.chars().any(|c| c.is_control() || c == '"'));

    match hint {
        Some(h) => h.to_ascii_lowercase(),
        None => mime_guess::from_path(name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::LocalStorage;
    use crate::shared::test_helpers::{FixedClock, InMemoryOrderRepository};
    use tokio::io::AsyncReadExt;

    const MAX: usize = 1024;

    struct Fixture {
        _dir: tempfile::TempDir,
        orders: Arc<InMemoryOrderRepository>,
        storage: Arc<LocalStorage>,
        service: AttachmentService,
        order: Order,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path().join("att")).unwrap());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let order = orders.insert_order(42, Some(7));
        let service = AttachmentService::new(
            orders.clone(),
            storage.clone(),
            Arc::new(FixedClock::at(1_000_000_000)),
            MAX,
        );

        Fixture {
            _dir: dir,
            orders,
            storage,
            service,
            order,
        }
    }

    fn stored_files(storage: &LocalStorage) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(storage.base_dir())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|n| n != crate::modules::storage::ACCESS_DENY_MARKER_FILE)
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_add_then_list_and_resolve() {
        let f = fixture();

        let record = f
            .service
            .add_attachment(&f.order, "../Invoice 2024.pdf", b"%PDF-1.4", None, 1)
            .await
            .unwrap();

        assert_eq!(record.name, "Invoice-2024.pdf");
        assert_eq!(record.mime, "application/pdf");
        assert_eq!(record.size, 8);
        assert_eq!(record.uploaded_by, 1);
        assert_eq!(record.uploaded_at.timestamp(), 1_000_000_000);
        assert!(record.path.starts_with(f.storage.base_dir()));
        assert!(record
            .path
            .ends_with(format!("{}__Invoice-2024.pdf", record.id)));

        let listed = f.service.list_attachments(&f.order).await.unwrap();
        assert_eq!(listed, vec![record.clone()]);

        let resolved = f
            .service
            .resolve_attachment(&f.order, &record.id)
            .await
            .unwrap();
        assert_eq!(resolved, Some(record.clone()));

        let (mut reader, size) = f.service.open_file(&record).await.unwrap();
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).await.unwrap();
        assert_eq!(size, 8);
        assert_eq!(contents, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let f = fixture();
        let first = f
            .service
            .add_attachment(&f.order, "b.txt", b"b", None, 1)
            .await
            .unwrap();
        let second = f
            .service
            .add_attachment(&f.order, "a.txt", b"a", None, 1)
            .await
            .unwrap();

        let ids: Vec<String> = f
            .service
            .list_attachments(&f.order)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_same_name_twice_gets_distinct_files() {
        let f = fixture();
        let a = f
            .service
            .add_attachment(&f.order, "scan.png", b"one", None, 1)
            .await
            .unwrap();
        let b = f
            .service
            .add_attachment(&f.order, "scan.png", b"two", None, 1)
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.path, b.path);
        assert_eq!(stored_files(&f.storage).len(), 2);
    }

    #[tokio::test]
    async fn test_long_multibyte_name_is_stored() {
        let f = fixture();
        let name = format!("{}.pdf", "zażółć".repeat(25));

        let record = f
            .service
            .add_attachment(&f.order, &name, b"x", None, 1)
            .await
            .unwrap();

        assert!(name.starts_with(&record.name));
        assert!(record.name.len() <= 200);
        assert!(f.service.file_exists(&record).await);
        assert_eq!(
            f.service.list_attachments(&f.order).await.unwrap(),
            vec![record]
        );
    }

    #[tokio::test]
    async fn test_size_bound_is_inclusive() {
        let f = fixture();

        let at_limit = vec![0u8; MAX];
        tokio_test::assert_ok!(
            f.service
                .add_attachment(&f.order, "max.bin", &at_limit, None, 1)
                .await
        );

        let over = vec![0u8; MAX + 1];
        let result = f
            .service
            .add_attachment(&f.order, "over.bin", &over, None, 1)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert_eq!(f.service.list_attachments(&f.order).await.unwrap().len(), 1);
        assert_eq!(stored_files(&f.storage).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_no_file_and_no_record() {
        let f = fixture();
        f.orders.fail_updates(true);

        let result = f
            .service
            .add_attachment(&f.order, "lost.txt", b"data", None, 1)
            .await;

        assert!(result.is_err());
        assert!(stored_files(&f.storage).is_empty());

        f.orders.fail_updates(false);
        assert!(f.service.list_attachments(&f.order).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let f = fixture();
        let record = f
            .service
            .add_attachment(&f.order, "notes.txt", b"hello", None, 1)
            .await
            .unwrap();

        assert!(f
            .service
            .remove_attachment(&f.order, &record.id)
            .await
            .unwrap());
        assert!(!record.path.exists());
        assert!(f.service.list_attachments(&f.order).await.unwrap().is_empty());

        assert!(!f
            .service
            .remove_attachment(&f.order, &record.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_remove_with_missing_file_still_drops_record() {
        let f = fixture();
        let record = f
            .service
            .add_attachment(&f.order, "gone.txt", b"x", None, 1)
            .await
            .unwrap();
        std::fs::remove_file(&record.path).unwrap();

        assert!(!f.service.file_exists(&record).await);
        assert!(f
            .service
            .remove_attachment(&f.order, &record.id)
            .await
            .unwrap());
        assert!(f.service.list_attachments(&f.order).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_keeps_other_records() {
        let f = fixture();
        let keep = f
            .service
            .add_attachment(&f.order, "keep.txt", b"k", None, 1)
            .await
            .unwrap();
        let drop = f
            .service
            .add_attachment(&f.order, "drop.txt", b"d", None, 1)
            .await
            .unwrap();

        f.service.remove_attachment(&f.order, &drop.id).await.unwrap();

        assert_eq!(
            f.service.list_attachments(&f.order).await.unwrap(),
            vec![keep]
        );
    }

    #[tokio::test]
    async fn test_storage_dir_gets_deny_marker() {
        let f = fixture();
        f.service
            .add_attachment(&f.order, "a.txt", b"a", None, 1)
            .await
            .unwrap();

        assert!(f
            .storage
            .base_dir()
            .join(crate::modules::storage::ACCESS_DENY_MARKER_FILE)
            .exists());
    }

    #[test]
    fn test_resolve_mime() {
        assert_eq!(resolve_mime(Some("image/PNG"), "x.bin"), "image/png");
        assert_eq!(resolve_mime(None, "photo.jpg"), "image/jpeg");
        assert_eq!(
            resolve_mime(Some("application/octet-stream"), "doc.pdf"),
            "application/pdf"
        );
        assert_eq!(resolve_mime(Some("text/plain\r\nX: y"), "a.txt"), "text/plain");
        assert_eq!(resolve_mime(None, "file"), DEFAULT_MIME_TYPE);
    }
}
