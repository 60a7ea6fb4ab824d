pub mod attachments;
pub mod auth;
pub mod orders;
