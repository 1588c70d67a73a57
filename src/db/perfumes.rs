use async_trait::async_trait;
use bson::{Document, doc};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use tracing::instrument;

use super::{PerfumeStore, StoreError, StoreResult, parse_object_id};
use crate::models::perfume::SEARCHABLE_FIELDS;
use crate::models::{Perfume, PerfumeChanges};

pub const COLLECTION: &str = "perfumes";

pub struct MongoPerfumeStore {
    collection: Collection<Perfume>,
}

impl MongoPerfumeStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Perfume>(COLLECTION),
        }
    }

    /// Query values are matched literally, so user input never reaches the
    /// regex engine as a pattern.
    fn search_filter(filters: &[(String, String)]) -> Document {
        let mut filter = Document::new();
        for (field, value) in filters {
            if value.is_empty() || !SEARCHABLE_FIELDS.contains(&field.as_str()) {
                continue;
            }
            filter.insert(
                field.clone(),
                doc! { "$regex": regex::escape(value), "$options": "i" },
            );
        }
        filter
    }

    fn update_document(changes: &PerfumeChanges, now: DateTime<Utc>) -> Document {
        let mut set = doc! { "updated_at": bson::DateTime::from_chrono(now) };
        for (field, value) in changes.supplied() {
            set.insert(field, value);
        }
        doc! { "$set": set }
    }
}

#[async_trait]
impl PerfumeStore for MongoPerfumeStore {
    #[instrument(skip(self, perfume), fields(perfume_name = %perfume.name))]
    async fn insert(&self, perfume: Perfume) -> StoreResult<Perfume> {
        self.collection.insert_one(&perfume).await?;

        tracing::info!(perfume_id = %perfume.id, "Perfume created");
        Ok(perfume)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Perfume>> {
        let oid = parse_object_id(id)?;
        Ok(self.collection.find_one(doc! { "_id": oid }).await?)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> StoreResult<Vec<Perfume>> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self))]
    async fn search(&self, filters: Vec<(String, String)>) -> StoreResult<Vec<Perfume>> {
        let filter = Self::search_filter(&filters);
        let cursor = self.collection.find(filter).await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &str, changes: PerfumeChanges) -> StoreResult<Perfume> {
        let oid = parse_object_id(id)?;
        let update = Self::update_document(&changes, Utc::now());

        let perfume = self
            .collection
            .find_one_and_update(doc! { "_id": oid }, update)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(StoreError::NotFound("perfume"))?;

        tracing::info!(perfume_id = %id, "Perfume updated");
        Ok(perfume)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> StoreResult<()> {
        let oid = parse_object_id(id)?;
        let result = self.collection.delete_one(doc! { "_id": oid }).await?;

        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("perfume"));
        }

        tracing::info!(perfume_id = %id, "Perfume deleted");
        Ok(())
    }
}
