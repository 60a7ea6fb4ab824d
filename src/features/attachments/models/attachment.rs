use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::shared::constants::{ATTACHMENTS_SCHEMA_VERSION, DEFAULT_MIME_TYPE};

/// One stored file tied to one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Public handle, UUID v4 for records created here
    #[serde(default)]
    pub id: String,
    /// Sanitized original filename
    #[serde(default)]
    pub name: String,
    /// Absolute location of the bytes; never leaves the service
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default = "default_mime")]
    pub mime: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, deserialize_with = "deserialize_uploaded_at")]
    pub uploaded_at: DateTime<Utc>,
    /// Acting user id, `0` when unknown
    #[serde(default)]
    pub uploaded_by: i64,
}

fn default_mime() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC); anything else becomes the epoch.
fn deserialize_uploaded_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or_default())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[derive(Serialize)]
struct StoredAttachmentList<'a> {
    version: u32,
    items: &'a [AttachmentRecord],
}

/// Serialize a list into the versioned envelope stored in order metadata
pub fn encode_attachment_list(records: &[AttachmentRecord]) -> Value {
    serde_json::to_value(StoredAttachmentList {
        version: ATTACHMENTS_SCHEMA_VERSION,
        items: records,
    })
    .unwrap_or_else(|_| Value::Array(Vec::new()))
}

/// Decode a persisted list without ever failing.
///
/// Accepts the versioned envelope and the legacy bare array. Items that do not
/// decode, or that have no id, are skipped with a warning.
pub fn decode_attachment_list(value: Option<Value>) -> Vec<AttachmentRecord> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut envelope)) => {
            let version = envelope
                .get("version")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if version > u64::from(ATTACHMENTS_SCHEMA_VERSION) {
                warn!(
                    "Attachment list written by newer schema version {}; reading known fields only",
                    version
                );
            }
            match envelope.remove("items") {
                Some(Value::Array(items)) => items,
                _ => {
                    warn!("Attachment list envelope has no items array; treating as empty");
                    return Vec::new();
                }
            }
        }
        Some(other) => {
            warn!(
                "Unexpected attachment list shape ({}); treating as empty",
                json_kind(&other)
            );
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<AttachmentRecord>(item) {
            Ok(record) if !record.id.is_empty() => Some(record),
            Ok(_) => {
                warn!("Skipping attachment record without id");
                None
            }
            Err(e) => {
                warn!("Skipping malformed attachment record: {}", e);
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
