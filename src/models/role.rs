use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE_ID: &str = "1";
pub const CUSTOMER_ROLE_ID: &str = "2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "_id")]
    pub id: String,
    pub role_name: String,
}

impl Role {
    pub fn new(id: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role_name: role_name.into(),
        }
    }

    /// The roles every deployment starts with.
    pub fn defaults() -> [Role; 2] {
        [
            Role::new(ADMIN_ROLE_ID, "admin"),
            Role::new(CUSTOMER_ROLE_ID, "customer"),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role_id: String,
    pub role_name: String,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            role_id: role.id,
            role_name: role.role_name,
        }
    }
}
