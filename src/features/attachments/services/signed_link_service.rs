//! Signed, time-limited download links
//!
//! A link grants nothing on its own: after the signature and the expiry are
//! checked, the caller must still be allowed to read the order.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use crate::core::error::{AppError, Result};
use crate::features::attachments::services::AttachmentService;
use crate::features::auth::model::Principal;
use crate::features::auth::policy;
use crate::features::orders::OrderRepository;
use crate::modules::signing::{LinkRejection, LinkSigner};
use crate::modules::storage::BoxReader;

/// An attachment ready to be streamed to the client
pub struct DownloadHandle {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub reader: BoxReader,
}

pub struct SignedLinkService {
    signer: LinkSigner,
    orders: Arc<dyn OrderRepository>,
    attachments: Arc<AttachmentService>,
    clock: Arc<dyn Clock>,
    public_base_url: String,
}

impl SignedLinkService {
    pub fn new(
        signer: LinkSigner,
        orders: Arc<dyn OrderRepository>,
        attachments: Arc<AttachmentService>,
        clock: Arc<dyn Clock>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            orders,
            attachments,
            clock,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Absolute download URL signed at the current time
    pub fn mint_download_url(&self, order_id: i64, attachment_id: &str) -> String {
        let issued_at = self.clock.utc().timestamp();
        let signature = self.signer.sign(order_id, attachment_id, issued_at);

        format!(
            "{}/secure-download/order/{}/att/{}?signature={}&t={}",
            self.public_base_url,
            order_id,
            urlencoding::encode(attachment_id),
            signature,
            issued_at
        )
    }

    /// Check a presented signature against the clock
    pub fn verify(
        &self,
        order_id: i64,
        attachment_id: &str,
        signature: &str,
        issued_at: i64,
    ) -> std::result::Result<(), LinkRejection> {
        let now = self.clock.utc().timestamp();
        self.signer
            .verify(order_id, attachment_id, signature, issued_at, now)
    }

    /// Resolve a signed download request to an open file.
    ///
    /// Checks run in a fixed order: expiry and signature, then the order,
    /// then the caller's read access, then the attachment and its file.
    pub async fn handle_download(
        &self,
        order_id: i64,
        attachment_id: &str,
        signature: &str,
        issued_at: i64,
        principal: &Principal,
    ) -> Result<DownloadHandle> {
        self.verify(order_id, attachment_id, signature, issued_at)?;

        let order = self
            .orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if !policy::can_access(&order, principal) {
            warn!(
                "User {} denied download of attachment {} on order {}",
                principal.user_id(),
                attachment_id,
                order_id
            );
            return Err(AppError::Forbidden(
                "You do not have access to this order's attachments".to_string(),
            ));
        }

        let record = self
            .attachments
            .resolve_attachment(&order, attachment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attachment not found".to_string()))?;

        if !self.attachments.file_exists(&record).await {
            warn!(
                "Attachment {} on order {} has no file at {}",
                record.id,
                order_id,
                record.path.display()
            );
            return Err(AppError::NotFound("Attachment not found".to_string()));
        }

        let (reader, size) = self.attachments.open_file(&record).await?;

        info!(
            "User {} downloaded attachment {} ({}) from order {}",
            principal.user_id(),
            record.id,
            record.name,
            order_id
        );

        Ok(DownloadHandle {
            name: record.name,
            mime: record.mime,
            size,
            reader,
        })
    }
}
