//! Capability guards for the attachment endpoints.
//!
//! Reading an order's attachments is decided per order by
//! [`policy::can_access`](super::policy::can_access); mutating them requires the
//! store-wide management capability, checked here before the handler runs.

use crate::core::error::AppError;
use crate::features::auth::model::{AuthenticatedUser, Principal};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Guard for checking if user can manage the store.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireStoreManager(user): RequireStoreManager) { ... }
/// ```
pub struct RequireStoreManager(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireStoreManager
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<Principal>()
            .and_then(Principal::user)
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        if !super::policy::can_manage(user) {
            return Err(AppError::Forbidden(
                "Store management access required".to_string(),
            ));
        }

        Ok(RequireStoreManager(user.clone()))
    }
}
