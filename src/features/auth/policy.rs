//! Who may read and who may change an order's attachments.
//!
//! Read access and write access are deliberately different predicates:
//! customers can download their own order's files but never add or remove them.

use crate::features::auth::model::{AuthenticatedUser, Principal};
use crate::features::orders::models::Order;

/// Read access to one order's attachments.
///
/// Granted to store managers, generic order editors, the order's customer,
/// and users holding edit rights on this particular order. Anonymous callers
/// are always denied.
pub fn can_access(order: &Order, principal: &Principal) -> bool {
    let Some(user) = principal.user() else {
        return false;
    };

    user.is_store_manager()
        || user.is_order_editor()
        || order.is_owned_by(user.user_id)
        || user.can_edit_order(order.id)
}

/// Write access (add/remove) to any order's attachments
pub fn can_manage(user: &AuthenticatedUser) -> bool {
    user.is_store_manager()
}
