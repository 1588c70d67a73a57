use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never the plaintext.
    pub password: String,
    pub phone: String,
    pub role_id: String,
    /// Snapshot of the role name taken when the role id was last set.
    #[serde(default)]
    pub role_name: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub role_id: String,
    pub role_name: String,
}

impl User {
    pub fn new(input: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            username: input.username,
            email: input.email,
            password: input.password_hash,
            phone: input.phone,
            role_id: input.role_id,
            role_name: input.role_name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field overwrites for an existing user. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<String>,
    pub role_name: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        *self == UserChanges::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub role_id: String,
    pub role_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.to_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role_id: user.role_id.clone(),
            role_name: user.role_name.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
