pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use handlers::attachment_handler::AttachmentState;
pub use services::{AttachmentService, SignedLinkService};
