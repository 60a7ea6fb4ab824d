use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    Json,
};
use base64::prelude::*;
use tracing::debug;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::AppJson;
use crate::features::attachments::dtos::{
    AttachmentResponseDto, Base64UploadDto, DeleteAttachmentQuery, DeleteAttachmentResponseDto,
    UploadAttachmentDto,
};
use crate::features::attachments::models::AttachmentRecord;
use crate::features::attachments::services::{AttachmentService, SignedLinkService};
use crate::features::auth::guards::RequireStoreManager;
use crate::features::auth::model::Principal;
use crate::features::auth::policy;
use crate::features::orders::models::Order;
use crate::features::orders::OrderRepository;
use crate::shared::constants::DEFAULT_UPLOAD_FILENAME;
use crate::shared::types::{ApiResponse, Meta};
use crate::shared::validation::ATTACHMENT_ID_REGEX;

/// State for attachment handlers
#[derive(Clone)]
pub struct AttachmentState {
    pub orders: Arc<dyn OrderRepository>,
    pub attachment_service: Arc<AttachmentService>,
    pub link_service: Arc<SignedLinkService>,
}

impl AttachmentState {
    async fn load_order(&self, order_id: i64) -> Result<Order, AppError> {
        self.orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
    }

    fn to_response(&self, order_id: i64, record: AttachmentRecord) -> AttachmentResponseDto {
        let download_url = self.link_service.mint_download_url(order_id, &record.id);
        AttachmentResponseDto::from_record(record, download_url)
    }
}

fn ensure_can_read(order: &Order, principal: &Principal) -> Result<(), AppError> {
    if policy::can_access(order, principal) {
        return Ok(());
    }

    match principal {
        Principal::Anonymous => Err(AppError::Unauthorized(
            "Authentication required".to_string(),
        )),
        Principal::User(_) => Err(AppError::Forbidden(
            "You do not have access to this order's attachments".to_string(),
        )),
    }
}

/// List all attachments of an order
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}/attachments",
    tag = "attachments",
    params(
        ("order_id" = i64, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Attachments with fresh download URLs", body = ApiResponse<Vec<AttachmentResponseDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "No read access to this order"),
        (status = 404, description = "Order not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_attachments(
    principal: Principal,
    Path(order_id): Path<i64>,
    State(state): State<AttachmentState>,
) -> Result<Json<ApiResponse<Vec<AttachmentResponseDto>>>, AppError> {
    let order = state.load_order(order_id).await?;
    ensure_can_read(&order, &principal)?;

    let attachments: Vec<AttachmentResponseDto> = state
        .attachment_service
        .list_attachments(&order)
        .await?
        .into_iter()
        .map(|record| state.to_response(order.id, record))
        .collect();

    let meta = Meta {
        total: attachments.len() as i64,
    };

    Ok(Json(ApiResponse::success(Some(attachments), None, Some(meta))))
}

/// Get one attachment of an order
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}/attachments/{attachment_id}",
    tag = "attachments",
    params(
        ("order_id" = i64, Path, description = "Order ID"),
        ("attachment_id" = String, Path, description = "Attachment ID")
    ),
    responses(
        (status = 200, description = "Attachment with a fresh download URL", body = ApiResponse<AttachmentResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "No read access to this order"),
        (status = 404, description = "Order or attachment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_attachment(
    principal: Principal,
    Path((order_id, attachment_id)): Path<(i64, String)>,
    State(state): State<AttachmentState>,
) -> Result<Json<ApiResponse<AttachmentResponseDto>>, AppError> {
    let order = state.load_order(order_id).await?;
    ensure_can_read(&order, &principal)?;

    let record = state
        .attachment_service
        .resolve_attachment(&order, &attachment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attachment not found".to_string()))?;

    Ok(Json(ApiResponse::success(
        Some(state.to_response(order.id, record)),
        None,
        None,
    )))
}

/// Upload an attachment to an order
///
/// Accepts either `multipart/form-data` with a `file` field, or a JSON body
/// with `content_base64` and an optional `filename`.
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/attachments",
    tag = "attachments",
    params(
        ("order_id" = i64, Path, description = "Order ID")
    ),
    request_body(
        content(
            (UploadAttachmentDto = "multipart/form-data"),
            (Base64UploadDto = "application/json")
        ),
        description = "File to attach to the order"
    ),
    responses(
        (status = 201, description = "Attachment uploaded successfully", body = ApiResponse<AttachmentResponseDto>),
        (status = 400, description = "Missing file, invalid base64, or file too large"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Store management access required"),
        (status = 404, description = "Order not found"),
        (status = 413, description = "Request body too large")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_attachment(
    RequireStoreManager(user): RequireStoreManager,
    Path(order_id): Path<i64>,
    State(state): State<AttachmentState>,
    request: Request,
) -> Result<(StatusCode, Json<ApiResponse<AttachmentResponseDto>>), AppError> {
    let order = state.load_order(order_id).await?;

    let upload = read_upload(request).await?;

    let record = state
        .attachment_service
        .add_attachment(
            &order,
            &upload.filename,
            &upload.bytes,
            upload.content_type.as_deref(),
            user.user_id,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(state.to_response(order.id, record)),
            Some("Attachment uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// Delete an attachment from an order
#[utoipa::path(
    delete,
    path = "/api/orders/{order_id}/attachments",
    tag = "attachments",
    params(
        ("order_id" = i64, Path, description = "Order ID"),
        DeleteAttachmentQuery
    ),
    responses(
        (status = 200, description = "Attachment deleted", body = ApiResponse<DeleteAttachmentResponseDto>),
        (status = 400, description = "Missing or malformed att_id"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Store management access required"),
        (status = 404, description = "Order or attachment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_attachment(
    RequireStoreManager(_user): RequireStoreManager,
    Path(order_id): Path<i64>,
    Query(query): Query<DeleteAttachmentQuery>,
    State(state): State<AttachmentState>,
) -> Result<Json<ApiResponse<DeleteAttachmentResponseDto>>, AppError> {
    let attachment_id = query
        .att_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("att_id is required".to_string()))?;

    if !ATTACHMENT_ID_REGEX.is_match(attachment_id) {
        return Err(AppError::BadRequest("att_id is malformed".to_string()));
    }

    let order = state.load_order(order_id).await?;

    let removed = state
        .attachment_service
        .remove_attachment(&order, attachment_id)
        .await?;

    if !removed {
        return Err(AppError::NotFound("Attachment not found".to_string()));
    }

    Ok(Json(ApiResponse::success(
        Some(DeleteAttachmentResponseDto {
            deleted: attachment_id.to_string(),
        }),
        Some("Attachment deleted successfully".to_string()),
        None,
    )))
}

/// 413 when the body limit was hit, 400 otherwise
fn body_error(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(message)
    } else {
        AppError::BadRequest(message)
    }
}

struct UploadPayload {
    filename: String,
    bytes: Vec<u8>,
    content_type: Option<String>,
}

async fn read_upload(request: Request) -> Result<UploadPayload, AppError> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("application/json")
        })
        .unwrap_or(false);

    if is_json {
        read_base64_upload(request).await
    } else {
        read_multipart_upload(request).await
    }
}

async fn read_base64_upload(request: Request) -> Result<UploadPayload, AppError> {
    let AppJson(dto) = AppJson::<Base64UploadDto>::from_request(request, &())
        .await
        .map_err(|rejection| body_error(rejection.status(), rejection.message()))?;

    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let bytes = BASE64_STANDARD
        .decode(dto.content_base64.trim())
        .map_err(|e| AppError::Validation(format!("content_base64 is not valid base64: {}", e)))?;

    let filename = dto
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_UPLOAD_FILENAME.to_string());

    Ok(UploadPayload {
        filename,
        bytes,
        content_type: None,
    })
}

async fn read_multipart_upload(request: Request) -> Result<UploadPayload, AppError> {
    let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| {
        body_error(
            e.status(),
            format!("Expected multipart/form-data with a \"file\" field: {}", e),
        )
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        body_error(e.status(), format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name != "file" {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let content_type = field.content_type().map(|s| s.to_string());
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| DEFAULT_UPLOAD_FILENAME.to_string());

        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            body_error(e.status(), format!("Failed to read file data: {}", e))
        })?;

        return Ok(UploadPayload {
            filename,
            bytes: data.to_vec(),
            content_type,
        });
    }

    Err(AppError::BadRequest(
        "Missing file: send a multipart \"file\" field or content_base64".to_string(),
    ))
}
