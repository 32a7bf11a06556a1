//! In-memory vector storage and search.
//!
//! This module provides a simple vector database implementation using
//! in-memory storage and cosine similarity for search. Handy for tests and
//! single-process setups; data is lost when the process ends.

use super::store::{Result, SearchRequest, StoreError, VectorStore};
use super::types::{SearchHit, StoredRecord, DISTANCE_FIELD};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

struct MemoryIndex {
    vector_field: String,
    dimension: usize,
    records: BTreeMap<String, StoredRecord>,
}

/// An in-memory vector store.
///
/// Search is a linear scan, O(n * d) per query. Cloning shares the
/// underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    indexes: Arc<RwLock<HashMap<String, MemoryIndex>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn create_index(&self, name: &str, vector_field: &str, dimension: usize) -> Result<()> {
        let mut indexes = self.indexes.write().await;

        if let Some(existing) = indexes.get(name) {
            if existing.dimension != dimension {
                return Err(StoreError::DimensionConflict {
                    name: name.to_string(),
                    existing: existing.dimension,
                    requested: dimension,
                });
            }
            return Ok(());
        }

        indexes.insert(
            name.to_string(),
            MemoryIndex {
                vector_field: vector_field.to_string(),
                dimension,
                records: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        self.indexes
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::IndexNotFound(name.to_string()))
    }

    async fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.read().await.contains_key(name))
    }

    async fn write(&self, index: &str, records: Vec<StoredRecord>) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        let target = indexes
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        for record in &records {
            if let Some(vector) = record.vectors.get(&target.vector_field) {
                if vector.len() != target.dimension {
                    return Err(StoreError::InvalidVector {
                        field: target.vector_field.clone(),
                        expected: target.dimension,
                        actual: vector.len(),
                    });
                }
            }
        }

        for record in records {
            target.records.insert(record.key.clone(), record);
        }
        Ok(())
    }

    async fn search(&self, index: &str, request: SearchRequest) -> Result<Vec<SearchHit>> {
        let indexes = self.indexes.read().await;
        let target = indexes
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        let mut scored: Vec<(&StoredRecord, f32)> = target
            .records
            .values()
            .filter_map(|record| {
                record
                    .vectors
                    .get(&request.vector_field)
                    .map(|vector| (record, cosine_similarity(&request.vector, vector)))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let hits = scored
            .into_iter()
            .take(request.top_k)
            .map(|(record, score)| {
                let fields = request
                    .return_fields
                    .iter()
                    .filter_map(|field| {
                        if field == DISTANCE_FIELD {
                            Some((field.clone(), (1.0 - score).to_string()))
                        } else {
                            record.fields.get(field).map(|v| (field.clone(), v.clone()))
                        }
                    })
                    .collect();

                SearchHit {
                    key: record.key.clone(),
                    fields,
                    score,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn count(&self, index: &str) -> Result<usize> {
        self.indexes
            .read()
            .await
            .get(index)
            .map(|target| target.records.len())
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))
    }
}

/// Computes cosine similarity between two vectors.
///
/// Returns values from -1.0 (opposite) to 1.0 (identical), with 0.0 indicating
/// orthogonal vectors. Returns 0.0 for mismatched lengths or zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
