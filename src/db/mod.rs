use anyhow::{Context, Result};
use futures::stream::TryStreamExt;
use mongodb::bson::{Document, doc, to_document};
use mongodb::options::{ReplaceOneModel, WriteModel};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::MongoConfig;

const COLLECTION_PREFIX: &str = "IGDB_col_";

/// Index definitions for one mirrored collection. Every collection also gets
/// an ascending index on `id`, the upsert key.
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub text: &'static [&'static str],
    pub ascending: &'static [&'static str],
    pub composite: &'static [&'static [&'static str]],
}

impl IndexSpec {
    pub const NONE: Self = Self {
        text: &[],
        ascending: &[],
        composite: &[],
    };
}

/// View type returned by text search: the store's relevance score plus the
/// entity it was projected onto. The score is opaque; it only orders results
/// within a single query.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Scored<T> {
    pub score: f64,
    #[serde(flatten)]
    pub item: T,
}

/// Thin adapter over the MongoDB deployment. One collection per mirrored
/// entity class, named `IGDB_col_{endpoint}`.
#[derive(Clone)]
pub struct Store {
    client: Client,
    db: Database,
}

impl Store {
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.connection_string)
            .await
            .context("Failed to initialize MongoDB client")?;
        let db = client.database(&config.database_name);

        info!("Document store ready (database: {})", config.database_name);

        Ok(Self { client, db })
    }

    fn collection<T: Send + Sync>(&self, endpoint: &str) -> Collection<T> {
        self.db.collection(&format!("{COLLECTION_PREFIX}{endpoint}"))
    }

    pub async fn ensure_indexes(&self, endpoint: &str, spec: &IndexSpec) -> Result<()> {
        let mut models = vec![IndexModel::builder().keys(doc! { "id": 1 }).build()];

        if !spec.text.is_empty() {
            let mut keys = Document::new();
            for field in spec.text {
                keys.insert(*field, "text");
            }
            models.push(IndexModel::builder().keys(keys).build());
        }

        for field in spec.ascending {
            let mut keys = Document::new();
            keys.insert(*field, 1);
            models.push(IndexModel::builder().keys(keys).build());
        }

        for fields in spec.composite {
            let mut keys = Document::new();
            for field in *fields {
                keys.insert(*field, 1);
            }
            models.push(IndexModel::builder().keys(keys).build());
        }

        self.collection::<Document>(endpoint)
            .create_indexes(models)
            .await
            .with_context(|| format!("Failed to create indexes for {endpoint}"))?;
        Ok(())
    }

    /// Drops the collection and synchronously recreates its indexes, so
    /// concurrent readers never see data without indexes.
    pub async fn reset_collection(&self, endpoint: &str, spec: &IndexSpec) -> Result<()> {
        self.collection::<Document>(endpoint)
            .drop()
            .await
            .with_context(|| format!("Failed to drop collection for {endpoint}"))?;
        self.ensure_indexes(endpoint, spec).await
    }

    pub async fn find_by_id<T>(&self, endpoint: &str, id: i64) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(endpoint)
            .find_one(doc! { "id": id })
            .projection(doc! { "_id": 0 })
            .await
            .with_context(|| format!("Failed to look up {endpoint} item {id}"))
    }

    pub async fn find_by_ids<T>(&self, endpoint: &str, ids: &[i64]) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let cursor = self
            .collection::<T>(endpoint)
            .find(doc! { "id": { "$in": ids.to_vec() } })
            .projection(doc! { "_id": 0 })
            .await
            .with_context(|| format!("Failed to query {endpoint} by id set"))?;
        cursor
            .try_collect()
            .await
            .with_context(|| format!("Failed to read {endpoint} id-set results"))
    }

    pub async fn find_one_by<T>(&self, endpoint: &str, filter: Document) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(endpoint)
            .find_one(filter)
            .projection(doc! { "_id": 0 })
            .await
            .with_context(|| format!("Failed to query {endpoint}"))
    }

    /// Text search with score projection, sorted score-descending.
    pub async fn text_search<T>(
        &self,
        endpoint: &str,
        term: &str,
        filter: Option<Document>,
        limit: i64,
    ) -> Result<Vec<Scored<T>>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let mut query = doc! { "$text": { "$search": term } };
        if let Some(extra) = filter {
            query.extend(extra);
        }

        let cursor = self
            .collection::<Scored<T>>(endpoint)
            .find(query)
            .projection(doc! { "_id": 0, "score": { "$meta": "textScore" } })
            .sort(doc! { "score": { "$meta": "textScore" } })
            .limit(limit)
            .await
            .with_context(|| format!("Text search on {endpoint} failed"))?;
        cursor
            .try_collect()
            .await
            .with_context(|| format!("Failed to read {endpoint} text search results"))
    }

    /// Replace-or-insert by `id` for every item, applied in one round trip.
    pub async fn upsert_many<T, F>(&self, endpoint: &str, items: &[T], id_of: F) -> Result<()>
    where
        T: Serialize + Send + Sync,
        F: Fn(&T) -> i64,
    {
        if items.is_empty() {
            return Ok(());
        }

        let namespace = self.collection::<Document>(endpoint).namespace();
        let mut models = Vec::with_capacity(items.len());
        for item in items {
            let replacement = to_document(item)
                .with_context(|| format!("Failed to serialize {endpoint} item"))?;
            models.push(WriteModel::ReplaceOne(
                ReplaceOneModel::builder()
                    .namespace(namespace.clone())
                    .filter(doc! { "id": id_of(item) })
                    .replacement(replacement)
                    .upsert(true)
                    .build(),
            ));
        }

        self.client
            .bulk_write(models)
            .await
            .with_context(|| format!("Bulk upsert into {endpoint} failed"))?;
        Ok(())
    }

    pub async fn delete_by_id(&self, endpoint: &str, id: i64) -> Result<bool> {
        let result = self
            .collection::<Document>(endpoint)
            .delete_one(doc! { "id": id })
            .await
            .with_context(|| format!("Failed to delete {endpoint} item {id}"))?;
        Ok(result.deleted_count > 0)
    }

    pub async fn count(&self, endpoint: &str) -> Result<u64> {
        self.collection::<Document>(endpoint)
            .count_documents(doc! {})
            .await
            .with_context(|| format!("Failed to count {endpoint}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    struct Plain {
        id: i64,
        name: String,
    }

    #[test]
    fn test_scored_view_deserializes_projected_documents() {
        let projected = doc! { "score": 1.5, "id": 42i64, "name": "Doom" };
        let scored: Scored<Plain> = mongodb::bson::from_document(projected).unwrap();
        assert!((scored.score - 1.5).abs() < f64::EPSILON);
        assert_eq!(scored.item.id, 42);
        assert_eq!(scored.item.name, "Doom");
    }
}
