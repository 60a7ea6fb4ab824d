use sqlx::FromRow;

/// An order owned by the store platform.
///
/// This service never creates or deletes orders; it only reads the owner and
/// one metadata slot.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
    pub id: i64,
    /// Registered customer, `None` for guest checkouts
    pub customer_id: Option<i64>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        user_id > 0 && self.customer_id == Some(user_id)
    }
}
