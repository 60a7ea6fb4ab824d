use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};

use super::handlers::{
    attachment_handler::{
        delete_attachment, get_attachment, list_attachments, upload_attachment, AttachmentState,
    },
    download_handler::download_attachment,
};

/// Create routes for the order attachments feature
///
/// `upload_body_limit` applies to the upload route only.
pub fn routes(state: AttachmentState, upload_body_limit: usize) -> Router {
    Router::new()
        .route(
            "/api/orders/{order_id}/attachments",
            post(upload_attachment).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/api/orders/{order_id}/attachments",
            get(list_attachments).delete(delete_attachment),
        )
        .route(
            "/api/orders/{order_id}/attachments/{attachment_id}",
            get(get_attachment),
        )
        .route(
            "/secure-download/order/{order_id}/att/{attachment_id}",
            get(download_attachment),
        )
        .with_state(state)
}
