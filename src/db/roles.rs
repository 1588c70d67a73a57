use async_trait::async_trait;
use bson::doc;
use bson::oid::ObjectId;
use futures_util::TryStreamExt;
use mongodb::{Collection, Database};
use tracing::instrument;

use super::{RoleStore, StoreResult};
use crate::models::Role;

pub const COLLECTION: &str = "roles";

pub struct MongoRoleStore {
    collection: Collection<Role>,
}

impl MongoRoleStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Role>(COLLECTION),
        }
    }
}

#[async_trait]
impl RoleStore for MongoRoleStore {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Role>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    #[instrument(skip(self))]
    async fn create(&self, mut role: Role) -> StoreResult<Role> {
        if role.id.is_empty() {
            role.id = ObjectId::new().to_hex();
        }
        self.collection.insert_one(&role).await?;
        Ok(role)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> StoreResult<Vec<Role>> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
