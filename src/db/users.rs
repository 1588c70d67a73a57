use async_trait::async_trait;
use bson::{Document, doc};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use tracing::instrument;

use super::{StoreError, StoreResult, UserStore, parse_object_id};
use crate::models::{NewUser, User, UserChanges};

pub const COLLECTION: &str = "users";

pub struct MongoUserStore {
    collection: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<User>(COLLECTION),
        }
    }

    /// `$or` over the non-empty identity fields, `None` if both are empty.
    fn identity_filter(email: &str, username: &str) -> Option<Document> {
        let mut clauses = Vec::new();
        if !email.is_empty() {
            clauses.push(doc! { "email": email });
        }
        if !username.is_empty() {
            clauses.push(doc! { "username": username });
        }
        if clauses.is_empty() {
            None
        } else {
            Some(doc! { "$or": clauses })
        }
    }

    fn update_document(changes: &UserChanges, now: DateTime<Utc>) -> Document {
        let mut set = doc! { "updated_at": bson::DateTime::from_chrono(now) };
        let fields = [
            ("username", &changes.username),
            ("email", &changes.email),
            ("password", &changes.password_hash),
            ("phone", &changes.phone),
            ("role_id", &changes.role_id),
            ("role_name", &changes.role_name),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                set.insert(field, value.clone());
            }
        }
        doc! { "$set": set }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    #[instrument(skip(self))]
    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let count = self
            .collection
            .count_documents(doc! { "email": email })
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        let count = self
            .collection
            .count_documents(doc! { "username": username })
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn find_by_identity(&self, email: &str, username: &str) -> StoreResult<Option<User>> {
        let Some(filter) = Self::identity_filter(email, username) else {
            return Ok(None);
        };
        Ok(self.collection.find_one(filter).await?)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let oid = parse_object_id(id)?;
        Ok(self.collection.find_one(doc! { "_id": oid }).await?)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> StoreResult<Vec<User>> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let user = User::new(user);
        self.collection.insert_one(&user).await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &str, changes: UserChanges) -> StoreResult<User> {
        let oid = parse_object_id(id)?;
        let update = Self::update_document(&changes, Utc::now());

        let user = self
            .collection
            .find_one_and_update(doc! { "_id": oid }, update)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(StoreError::NotFound("user"))?;

        tracing::info!(user_id = %id, "User updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> StoreResult<()> {
        let oid = parse_object_id(id)?;
        let result = self.collection.delete_one(doc! { "_id": oid }).await?;

        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("user"));
        }

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}
