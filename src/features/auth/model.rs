use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::{CAP_EDIT_ORDERS, CAP_MANAGE_STORE};

/// A caller that presented a valid access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    /// Store-wide capabilities (`manage_store`, `edit_orders`, ...)
    pub capabilities: Vec<String>,
    /// Orders this user was granted edit rights on individually
    pub editable_orders: Vec<i64>,
}

impl AuthenticatedUser {
    /// Check if user holds a store-wide capability
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Check if user may edit one specific order
    pub fn can_edit_order(&self, order_id: i64) -> bool {
        self.editable_orders.contains(&order_id)
    }

    /// Check if user can manage the whole store
    pub fn is_store_manager(&self) -> bool {
        self.has_capability(CAP_MANAGE_STORE)
    }

    /// Check if user can edit orders in general
    pub fn is_order_editor(&self) -> bool {
        self.has_capability(CAP_EDIT_ORDERS)
    }
}

/// The acting identity of a request
#[derive(Debug, Clone, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    User(AuthenticatedUser),
}

impl Principal {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }

    /// User id, `0` for anonymous callers
    pub fn user_id(&self) -> i64 {
        self.user().map(|u| u.user_id).unwrap_or(0)
    }
}

/// Claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id; issuers send it as a string or a number
    #[serde(deserialize_with = "deserialize_subject")]
    pub sub: String,
    #[serde(default)]
    pub caps: Vec<String>,
    #[serde(default)]
    pub orders: Vec<i64>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

fn deserialize_subject<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Subject {
        Text(String),
        Number(i64),
    }

    Ok(match Subject::deserialize(deserializer)? {
        Subject::Text(s) => s,
        Subject::Number(n) => n.to_string(),
    })
}
