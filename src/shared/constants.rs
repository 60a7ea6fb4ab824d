/// Order metadata key holding the attachment list
pub const ATTACHMENTS_META_KEY: &str = "_order_attachments";

/// Version written into the persisted attachment list envelope
pub const ATTACHMENTS_SCHEMA_VERSION: u32 = 1;

/// MIME type used when nothing better is known
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Filename used for base64 uploads that do not name the file
pub const DEFAULT_UPLOAD_FILENAME: &str = "file.bin";

// =============================================================================
// CAPABILITY CONSTANTS
// =============================================================================

/// Store-wide management - can read and mutate every order's attachments
pub const CAP_MANAGE_STORE: &str = "manage_store";

/// Generic order editing - can read every order's attachments
pub const CAP_EDIT_ORDERS: &str = "edit_orders";
