pub mod attachment_handler;
pub mod download_handler;
