use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::core::error::AppError;
use crate::features::attachments::dtos::DownloadQuery;
use crate::features::attachments::handlers::attachment_handler::AttachmentState;
use crate::features::auth::model::Principal;

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Stream an attachment through a signed link
#[utoipa::path(
    get,
    path = "/secure-download/order/{order_id}/att/{attachment_id}",
    tag = "attachments",
    params(
        ("order_id" = i64, Path, description = "Order ID"),
        ("attachment_id" = String, Path, description = "Attachment ID"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 403, description = "Link invalid or expired, or no read access to the order"),
        (status = 404, description = "Order, attachment or file not found")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn download_attachment(
    principal: Principal,
    Path((order_id, attachment_id)): Path<(i64, String)>,
    Query(query): Query<DownloadQuery>,
    State(state): State<AttachmentState>,
) -> Result<Response, AppError> {
    let handle = state
        .link_service
        .handle_download(
            order_id,
            &attachment_id,
            &query.signature,
            query.issued_at(),
            &principal,
        )
        .await?;

    let body = Body::from_stream(ReaderStream::new(handle.reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, handle.mime)
        .header(header::CONTENT_DISPOSITION, content_disposition(&handle.name))
        .header(header::CONTENT_LENGTH, handle.size)
        .header(header::CACHE_CONTROL, NO_CACHE)
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build download response: {}", e)))
}

/// `attachment` disposition with an ASCII fallback name and the exact UTF-8 name
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .filter(|c| *c != '"' && *c != '\\')
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}
