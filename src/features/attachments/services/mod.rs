mod attachment_service;
mod signed_link_service;

pub use attachment_service::AttachmentService;
pub use signed_link_service::{DownloadHandle, SignedLinkService};
