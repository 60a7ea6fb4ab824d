use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::attachments::{dtos as attachments_dtos, handlers as attachments_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Attachments
        attachments_handlers::attachment_handler::list_attachments,
        attachments_handlers::attachment_handler::get_attachment,
        attachments_handlers::attachment_handler::upload_attachment,
        attachments_handlers::attachment_handler::delete_attachment,
        // Signed downloads
        attachments_handlers::download_handler::download_attachment,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Attachments
            attachments_dtos::AttachmentResponseDto,
            attachments_dtos::Base64UploadDto,
            attachments_dtos::UploadAttachmentDto,
            attachments_dtos::DeleteAttachmentResponseDto,
            ApiResponse<attachments_dtos::AttachmentResponseDto>,
            ApiResponse<Vec<attachments_dtos::AttachmentResponseDto>>,
            ApiResponse<attachments_dtos::DeleteAttachmentResponseDto>,
        )
    ),
    tags(
        (name = "attachments", description = "Order attachments and signed download links"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Order Attachments API",
        version = "0.1.0",
        description = "Private order attachments served through signed, time-limited links",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
