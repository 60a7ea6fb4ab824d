use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::attachments::models::AttachmentRecord;

/// Response DTO for an order attachment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttachmentResponseDto {
    /// Attachment identifier
    pub id: String,
    /// Sanitized original filename
    pub name: String,
    /// MIME type of the file
    pub mime: String,
    /// Size of the file in bytes
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    /// User who uploaded the file, `0` when unknown
    pub uploaded_by: i64,
    /// Freshly signed, time-limited download URL
    pub download_url: String,
}

impl AttachmentResponseDto {
    pub fn from_record(record: AttachmentRecord, download_url: String) -> Self {
        Self {
            id: record.id,
            name: record.name,
            mime: record.mime,
            size: record.size,
            uploaded_at: record.uploaded_at,
            uploaded_by: record.uploaded_by,
            download_url,
        }
    }
}

/// JSON upload body carrying the file as base64
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct Base64UploadDto {
    /// Defaults to `file.bin`
    #[validate(length(max = 255, message = "filename must be at most 255 characters"))]
    pub filename: Option<String>,

    /// File content, standard base64
    #[validate(length(min = 1, message = "content_base64 is required"))]
    pub content_base64: String,
}

/// Upload attachment request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler reads the multipart body directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadAttachmentDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteAttachmentQuery {
    /// Attachment to delete
    pub att_id: Option<String>,
}

/// Response DTO for delete attachment operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteAttachmentResponseDto {
    /// Id of the removed attachment
    pub deleted: String,
}

/// Query string of a signed download link
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Hex signature
    #[serde(default)]
    pub signature: String,
    /// Issue time, unix seconds
    pub t: Option<String>,
}

impl DownloadQuery {
    /// Issue time; missing or unparseable values read as `0`
    pub fn issued_at(&self) -> i64 {
        self.t
            .as_deref()
            .and_then(|t| t.trim().parse::<i64>().ok())
            .unwrap_or(0)
    }
}
