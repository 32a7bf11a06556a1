//! Vector store abstraction and factory.
//!
//! This module provides a unified interface for different vector database implementations.

use super::memory_store::MemoryStore;
use super::qdrant_store::QdrantStore;
use super::types::{SearchHit, StoredRecord};
use crate::config::{StorageConfig, StorageMode};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Index '{0}' not found")]
    IndexNotFound(String),

    #[error("Index '{name}' already exists with dimension {existing}, requested {requested}")]
    DimensionConflict {
        name: String,
        existing: usize,
        requested: usize,
    },

    #[error("Vector for field '{field}' has length {actual}, index expects {expected}")]
    InvalidVector {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Parameters of one similarity search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    /// Vector field the query is compared against
    pub vector_field: String,
    pub top_k: usize,
    /// Fields copied into each hit; [`DISTANCE_FIELD`](super::types::DISTANCE_FIELD)
    /// asks for the hit's distance to the query.
    pub return_fields: Vec<String>,
}

/// Unified interface for vector database operations.
///
/// An index is one knowledge base: a named collection of records whose
/// vector field has a dimension fixed at creation. Implementations must be
/// safe to share between concurrent callers.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates an index whose `vector_field` holds vectors of `dimension`.
    ///
    /// Succeeds without changes when the index already exists with the same
    /// dimension; fails with [`StoreError::DimensionConflict`] otherwise.
    async fn create_index(&self, name: &str, vector_field: &str, dimension: usize) -> Result<()>;

    /// Drops an index and everything in it.
    ///
    /// Returns [`StoreError::IndexNotFound`] when there is no such index.
    async fn delete_index(&self, name: &str) -> Result<()>;

    async fn index_exists(&self, name: &str) -> Result<bool>;

    /// Adds or replaces records, keyed by [`StoredRecord::key`].
    async fn write(&self, index: &str, records: Vec<StoredRecord>) -> Result<()>;

    /// Returns the `top_k` closest records, closest first.
    async fn search(&self, index: &str, request: SearchRequest) -> Result<Vec<SearchHit>>;

    /// Returns the number of records in an index.
    async fn count(&self, index: &str) -> Result<usize>;
}

/// Creates a vector store instance based on the storage mode.
///
/// - `Memory` mode keeps everything in-process
/// - `Grpc` mode uses Qdrant for remote server connectivity
///
/// The returned handle is meant to be created once and passed to every
/// pipeline that needs it.
pub async fn create_vector_store(storage_config: &StorageConfig) -> Result<Arc<dyn VectorStore>> {
    match &storage_config.storage_mode {
        StorageMode::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageMode::Grpc { url } => {
            let store = QdrantStore::new(url)?;
            Ok(Arc::new(store))
        }
    }
}
