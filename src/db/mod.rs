//! Document-store access.
//!
//! Each collection sits behind an async trait so the service and HTTP layers
//! never see the driver; `users`, `roles` and `perfumes` hold the MongoDB
//! implementations.

pub mod perfumes;
pub mod roles;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use bson::Document;
use bson::oid::ObjectId;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use thiserror::Error;

use crate::models::{NewUser, Perfume, PerfumeChanges, Role, User, UserChanges};

pub use perfumes::MongoPerfumeStore;
pub use roles::MongoRoleStore;
pub use users::MongoUserStore;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid identifier format: {0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique index rejected the write; holds the offending field.
    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(mongodb::error::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if let Some(field) = duplicate_key_message(&err).map(duplicate_field) {
            return StoreError::Duplicate(field);
        }
        StoreError::Database(err)
    }
}

fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(e.message.as_str())
        }
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY => Some(e.message.as_str()),
        _ => None,
    }
}

/// Extracts the field name from an E11000 message
/// (`... index: email_1 dup key: { ... }`).
fn duplicate_field(message: &str) -> String {
    message
        .split("index: ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .map(|index| index.strip_suffix("_1").unwrap_or(index).to_string())
        .unwrap_or_else(|| "record".to_string())
}

pub fn parse_object_id(id: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists_by_email(&self, email: &str) -> StoreResult<bool>;

    async fn exists_by_username(&self, username: &str) -> StoreResult<bool>;

    /// Matches either field; an empty argument is left out of the lookup.
    async fn find_by_identity(&self, email: &str, username: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    async fn list(&self) -> StoreResult<Vec<User>>;

    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn update(&self, id: &str, changes: UserChanges) -> StoreResult<User>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Role>>;

    /// Persists the role, generating an id when `role.id` is empty.
    async fn create(&self, role: Role) -> StoreResult<Role>;

    async fn list(&self) -> StoreResult<Vec<Role>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PerfumeStore: Send + Sync {
    async fn insert(&self, perfume: Perfume) -> StoreResult<Perfume>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Perfume>>;

    async fn list(&self) -> StoreResult<Vec<Perfume>>;

    /// Case-insensitive substring match on every `(field, value)` pair.
    /// Pairs naming a field outside `SEARCHABLE_FIELDS` are ignored.
    async fn search(&self, filters: Vec<(String, String)>) -> StoreResult<Vec<Perfume>>;

    async fn update(&self, id: &str, changes: PerfumeChanges) -> StoreResult<Perfume>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// Opens a client and verifies the server answers before handing it out.
pub async fn connect(url: &str) -> Result<Client, mongodb::error::Error> {
    let mut options = ClientOptions::parse(url).await?;
    options.app_name = Some("elfume".to_string());
    options.connect_timeout = Some(Duration::from_secs(10));
    options.server_selection_timeout = Some(Duration::from_secs(30));

    let client = Client::with_options(options)?;
    client.list_database_names().await?;

    tracing::info!("Connected to MongoDB");
    Ok(client)
}

/// Unique indexes backing the email/username invariant. Existence checks in
/// the auth service give friendly errors; these close the race between them.
pub async fn init_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let users = db.collection::<User>(users::COLLECTION);
    for field in ["email", "username"] {
        let mut keys = Document::new();
        keys.insert(field, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users.create_index(index).await?;
    }
    tracing::info!("User indexes ensured");
    Ok(())
}

/// Inserts the admin and customer roles when they are missing.
pub async fn seed_default_roles(roles: &dyn RoleStore) -> StoreResult<()> {
    for role in Role::defaults() {
        if roles.find_by_id(&role.id).await?.is_none() {
            let role = roles.create(role).await?;
            tracing::info!(role_id = %role.id, role_name = %role.role_name, "Seeded role");
        }
    }
    Ok(())
}
