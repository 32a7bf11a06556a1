//! Document indexing for RAG.
//!
//! The [`Indexer`] turns documents into store records: it maps each document
//! with the [`DocumentMapper`], embeds every field that names an embed
//! target, and writes the result to the vector store in batches.

use super::embedder::{Embedder, EmbedderError};
use super::mapper::{DocumentMapper, MapperError};
use super::store::{StoreError, VectorStore};
use super::types::{Document, StoredRecord};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while storing documents.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Failed to map document: {0}")]
    Mapper(#[from] MapperError),

    #[error("Record key '{key}' is outside the index prefix '{prefix}'")]
    KeyOutsidePrefix { key: String, prefix: String },

    #[error("Failed to embed document fields: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("Failed to write records: {0}")]
    Store(#[from] StoreError),
}

/// Result type for indexing operations.
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Writes documents of one knowledge base into a vector store.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<dyn VectorStore>,
    index_name: String,
    key_prefix: String,
    batch_size: usize,
    mapper: DocumentMapper,
    embedder: Embedder,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        index_name: impl Into<String>,
        key_prefix: impl Into<String>,
        batch_size: usize,
        mapper: DocumentMapper,
        embedder: Embedder,
    ) -> Self {
        Self {
            store,
            index_name: index_name.into(),
            key_prefix: key_prefix.into(),
            batch_size: batch_size.max(1),
            mapper,
            embedder,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Maps, embeds and writes `documents`, `batch_size` at a time.
    ///
    /// Returns the stored record keys in input order. Each batch costs one
    /// provider call and one store write; a failure aborts the remaining
    /// batches.
    pub async fn store(&self, documents: &[Document]) -> Result<Vec<String>> {
        let mut keys = Vec::with_capacity(documents.len());

        for batch in documents.chunks(self.batch_size) {
            let records = self.prepare_batch(batch).await?;
            keys.extend(records.iter().map(|r| r.key.clone()));

            debug!(index = %self.index_name, records = records.len(), "Writing batch");
            self.store.write(&self.index_name, records).await?;
        }

        info!(index = %self.index_name, documents = keys.len(), "Stored documents");
        Ok(keys)
    }

    async fn prepare_batch(&self, batch: &[Document]) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::with_capacity(batch.len());
        // (record position, vector field, text to embed)
        let mut pending: Vec<(usize, String, String)> = Vec::new();

        for document in batch {
            let record = self.mapper.map(document, document.source())?;
            if !record.key.starts_with(&self.key_prefix) {
                return Err(IndexerError::KeyOutsidePrefix {
                    key: record.key,
                    prefix: self.key_prefix.clone(),
                });
            }

            let position = records.len();
            let mut fields = HashMap::with_capacity(record.fields.len());
            for (name, field) in record.fields {
                if let Some(target) = field.embed_target {
                    pending.push((position, target, field.value.clone()));
                }
                fields.insert(name, field.value);
            }

            records.push(StoredRecord {
                key: record.key,
                fields,
                vectors: HashMap::new(),
            });
        }

        let texts: Vec<String> = pending.iter().map(|(_, _, text)| text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != pending.len() {
            return Err(IndexerError::Embedder(EmbedderError::NoEmbeddings));
        }

        for ((position, target, _), vector) in pending.into_iter().zip(vectors) {
            records[position].vectors.insert(target, vector);
        }

        Ok(records)
    }
}
