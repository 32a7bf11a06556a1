//! Similarity retrieval over one knowledge base.

use super::embedder::{Embedder, EmbedderError};
use super::store::{SearchRequest, StoreError, VectorStore};
use super::types::{RetrievedDocument, SearchHit, CONTENT_FIELD};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("Failed to embed query: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("Failed to search index: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Reshapes a raw store hit into a [`RetrievedDocument`].
pub type DocumentConverter = fn(SearchHit, &str) -> RetrievedDocument;

/// Default converter: `content` becomes the document content, every other
/// returned field becomes a metadata entry. The id is the record key with
/// the knowledge-base prefix stripped, i.e. the original document id.
pub fn convert_hit(hit: SearchHit, key_prefix: &str) -> RetrievedDocument {
    let id = hit
        .key
        .strip_prefix(key_prefix)
        .unwrap_or(&hit.key)
        .to_string();

    let mut content = String::new();
    let mut metadata = std::collections::HashMap::with_capacity(hit.fields.len());
    for (field, value) in hit.fields {
        if field == CONTENT_FIELD {
            content = value;
        } else {
            metadata.insert(field, value);
        }
    }

    RetrievedDocument {
        id,
        content,
        metadata,
    }
}

/// Runs top-K similarity searches against one index.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Embedder,
    index_name: String,
    key_prefix: String,
    top_k: usize,
    vector_field: String,
    return_fields: Vec<String>,
    converter: DocumentConverter,
}

impl Retriever {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Embedder,
        index_name: impl Into<String>,
        key_prefix: impl Into<String>,
        top_k: usize,
        vector_field: impl Into<String>,
        return_fields: Vec<String>,
        converter: DocumentConverter,
    ) -> Self {
        Self {
            store,
            embedder,
            index_name: index_name.into(),
            key_prefix: key_prefix.into(),
            top_k,
            vector_field: vector_field.into(),
            return_fields,
            converter,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Embeds `query` and returns the closest documents, closest first.
    ///
    /// An empty result is not an error.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        let vector = self.embedder.embed(query).await?;
        debug!(dimension = vector.len(), "Query embedding generated");

        let hits = self
            .store
            .search(
                &self.index_name,
                SearchRequest {
                    vector,
                    vector_field: self.vector_field.clone(),
                    top_k: self.top_k,
                    return_fields: self.return_fields.clone(),
                },
            )
            .await?;

        info!(index = %self.index_name, results = hits.len(), "Found results from RAG search");

        Ok(hits
            .into_iter()
            .map(|hit| (self.converter)(hit, &self.key_prefix))
            .collect())
    }
}
