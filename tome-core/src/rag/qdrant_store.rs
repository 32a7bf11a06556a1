//! Qdrant vector database storage implementation.
//!
//! Each knowledge base maps to one Qdrant collection with a single named
//! vector. Record keys are hashed into numeric point ids, so writing a key
//! twice replaces the earlier point.

use super::store::{Result, SearchRequest, StoreError, VectorStore};
use super::types::{SearchHit, StoredRecord, DISTANCE_FIELD};
use anyhow::Context;
use async_trait::async_trait;
use qdrant_client::{
    Payload, Qdrant,
    qdrant::{
        vectors_config::Config, CreateCollectionBuilder, Distance, PointStruct,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, VectorParamsMap,
        VectorsConfig,
    },
};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Payload key holding the original record key.
const KEY_PAYLOAD: &str = "_key";

/// Qdrant-based vector store.
///
/// The underlying client is cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct QdrantStore {
    client: Arc<Qdrant>,
}

impl QdrantStore {
    /// Creates a client for the Qdrant server at `url` (gRPC port, usually 6334).
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .context("Failed to connect to Qdrant server")?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Returns the size of `vector_field` for an existing collection.
    async fn existing_dimension(&self, name: &str, vector_field: &str) -> Result<Option<usize>> {
        let info = self
            .client
            .collection_info(name)
            .await
            .context("Failed to get collection info")?;

        let config = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config);

        Ok(match config {
            Some(Config::ParamsMap(map)) => map.map.get(vector_field).map(|p| p.size as usize),
            Some(Config::Params(params)) => Some(params.size as usize),
            None => None,
        })
    }

    /// Maps a failed call to `IndexNotFound` when the collection is gone.
    async fn not_found_or(&self, name: &str, err: anyhow::Error) -> StoreError {
        match self.client.collection_exists(name).await {
            Ok(false) => StoreError::IndexNotFound(name.to_string()),
            _ => StoreError::Backend(err),
        }
    }
}

/// Derives a stable numeric point id from a record key.
fn point_id(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_index(&self, name: &str, vector_field: &str, dimension: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .context("Failed to check collection")?;

        if exists {
            return match self.existing_dimension(name, vector_field).await? {
                Some(existing) if existing != dimension => Err(StoreError::DimensionConflict {
                    name: name.to_string(),
                    existing,
                    requested: dimension,
                }),
                _ => {
                    debug!(collection = name, "Collection already exists");
                    Ok(())
                }
            };
        }

        let map = HashMap::from([(
            vector_field.to_string(),
            VectorParamsBuilder::new(dimension as u64, Distance::Cosine).build(),
        )]);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name).vectors_config(VectorsConfig {
                    config: Some(Config::ParamsMap(VectorParamsMap { map })),
                }),
            )
            .await
            .context("Failed to create collection")?;

        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .context("Failed to check collection")?;

        if !exists {
            return Err(StoreError::IndexNotFound(name.to_string()));
        }

        self.client
            .delete_collection(name)
            .await
            .context("Failed to delete collection")?;

        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .client
            .collection_exists(name)
            .await
            .context("Failed to check collection")?)
    }

    async fn write(&self, index: &str, records: Vec<StoredRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut points = Vec::with_capacity(records.len());
        for record in records {
            let mut payload = serde_json::Map::new();
            for (field, value) in record.fields {
                payload.insert(field, json!(value));
            }
            payload.insert(KEY_PAYLOAD.to_string(), json!(record.key));

            let payload = Payload::try_from(serde_json::Value::Object(payload))
                .context("Failed to build point payload")?;

            points.push(PointStruct::new(point_id(&record.key), record.vectors, payload));
        }

        if let Err(e) = self
            .client
            .upsert_points(UpsertPointsBuilder::new(index, points).wait(true))
            .await
        {
            let err = anyhow::Error::new(e).context("Failed to upsert points");
            return Err(self.not_found_or(index, err).await);
        }

        Ok(())
    }

    async fn search(&self, index: &str, request: SearchRequest) -> Result<Vec<SearchHit>> {
        let search_result = match self
            .client
            .search_points(
                SearchPointsBuilder::new(index, request.vector, request.top_k as u64)
                    .vector_name(request.vector_field)
                    .with_payload(true),
            )
            .await
        {
            Ok(result) => result,
            Err(e) => {
                let err = anyhow::Error::new(e).context("Failed to search points");
                return Err(self.not_found_or(index, err).await);
            }
        };

        let hits = search_result
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let key = payload
                    .get(KEY_PAYLOAD)
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();

                let fields = request
                    .return_fields
                    .iter()
                    .filter_map(|field| {
                        if field == DISTANCE_FIELD {
                            // Cosine score, so the distance is its complement.
                            Some((field.clone(), (1.0 - point.score).to_string()))
                        } else {
                            payload
                                .get(field)
                                .and_then(|v| v.as_str())
                                .map(|s| (field.clone(), s.to_string()))
                        }
                    })
                    .collect();

                SearchHit {
                    key,
                    fields,
                    score: point.score,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn count(&self, index: &str) -> Result<usize> {
        if !self.index_exists(index).await? {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }

        let info = self
            .client
            .collection_info(index)
            .await
            .context("Failed to get collection info")?;

        Ok(info.result.map(|r| r.points_count.unwrap_or(0) as usize).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::types::{CONTENT_FIELD, VECTOR_FIELD};

    #[test]
    fn test_point_id_is_stable() {
        assert_eq!(point_id("kb:doc_1"), point_id("kb:doc_1"));
        assert_ne!(point_id("kb:doc_1"), point_id("kb:doc_2"));
    }

    #[tokio::test]
    #[ignore] // Requires Qdrant server running
    async fn test_qdrant_store_grpc() {
        let store = QdrantStore::new("http://localhost:6334").unwrap();
        let index = "tome_test_collection";
        let _ = store.delete_index(index).await;

        store.create_index(index, VECTOR_FIELD, 3).await.unwrap();

        let record = StoredRecord {
            key: "kb:doc_1".to_string(),
            fields: HashMap::from([(CONTENT_FIELD.to_string(), "Hello world".to_string())]),
            vectors: HashMap::from([(VECTOR_FIELD.to_string(), vec![1.0, 0.0, 0.0])]),
        };
        store.write(index, vec![record]).await.unwrap();
        assert_eq!(store.count(index).await.unwrap(), 1);

        let hits = store
            .search(
                index,
                SearchRequest {
                    vector: vec![1.0, 0.0, 0.0],
                    vector_field: VECTOR_FIELD.to_string(),
                    top_k: 5,
                    return_fields: vec![CONTENT_FIELD.to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(hits[0].key, "kb:doc_1");
        assert_eq!(hits[0].fields[CONTENT_FIELD], "Hello world");

        store.delete_index(index).await.unwrap();
        assert!(matches!(
            store.delete_index(index).await,
            Err(StoreError::IndexNotFound(_))
        ));
    }
}
