//! Retrieval Augmented Generation (RAG) pipelines.
//!
//! # Overview
//!
//! RAG combines:
//! 1. **Retrieval**: finding relevant documents in a knowledge base
//! 2. **Augmentation**: adding those documents to the LLM prompt
//! 3. **Generation**: done by a downstream model, outside this crate
//!
//! # Architecture
//!
//! - [`DocumentMapper`]: document -> store record shape
//! - [`Embedder`]: text -> vector, with a fixed expected dimension
//! - [`VectorStore`]: index management and similarity search (Qdrant or in-memory)
//! - [`Indexer`] / [`Retriever`]: the store-facing halves of the pipelines
//! - [`RagIndexer`] / [`RagQuery`]: configuration-driven entry points
//! - [`build_rag_prompt`]: retrieved documents + question -> prompt
//!
//! # How It Works
//!
//! 1. **Indexing Phase**:
//!    - A knowledge base (one store index) is created with the configured dimension
//!    - A whole file becomes one document; it is not chunked
//!    - The document's content is embedded and written with its source label
//!
//! 2. **Retrieval Phase**:
//!    - The question is embedded
//!    - The store returns the top-k closest documents
//!    - Documents and question are assembled into a prompt

mod embedder;
mod indexer;
mod mapper;
mod memory_store;
mod prompt;
mod qdrant_store;
mod retriever;
mod store;
mod types;
pub mod utils;

pub use embedder::{Embedder, EmbedderError};
pub use indexer::{Indexer, IndexerError};
pub use mapper::{DocumentMapper, MapperError};
pub use memory_store::MemoryStore;
pub use prompt::build_rag_prompt;
pub use qdrant_store::QdrantStore;
pub use retriever::{convert_hit, DocumentConverter, Retriever, RetrieverError};
pub use store::{create_vector_store, SearchRequest, StoreError, VectorStore};
pub use types::{
    Document, FieldValue, IndexRecord, RetrievedDocument, SearchHit, StoredRecord,
    CONTENT_FIELD, DISTANCE_FIELD, METADATA_FIELD, SOURCE_KEY, VECTOR_FIELD,
};

use crate::config::Config;
use crate::provider::{create_provider, EmbeddingProvider, ProviderError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Id given to the single document a file becomes.
pub const FILE_DOCUMENT_ID: &str = "doc_1";

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Failed to create embedder: {0}")]
    Provider(#[from] ProviderError),

    #[error("Embedding dimension check failed: {0}")]
    Dimension(#[source] EmbedderError),

    #[error("Failed to init index '{index}': {source}")]
    InitIndex {
        index: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete index '{index}': {source}")]
    DeleteIndex {
        index: String,
        #[source]
        source: StoreError,
    },

    #[error("Knowledge base '{0}' not found")]
    KnowledgeBaseNotFound(String),

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to store document: {0}")]
    Indexer(#[from] IndexerError),

    #[error("Failed to retrieve documents: {0}")]
    Retrieval(#[from] RetrieverError),

    #[error("No uploaded file found for user {0}")]
    NoUploadedFile(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

/// Builds knowledge bases from files.
///
/// Construction creates the knowledge base in the store; every
/// [`index_file`](Self::index_file) call then adds one document to it.
#[derive(Clone)]
pub struct RagIndexer {
    knowledge_base: String,
    indexer: Indexer,
}

impl RagIndexer {
    /// Creates the knowledge base `knowledge_base` and an indexer for it.
    ///
    /// The provider for `embedding_model` is resolved from `config.embedding`
    /// (base URL, API key from the environment).
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tome_core::{Config, rag::{create_vector_store, RagIndexer}};
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = Config::load_or_default();
    /// let store = create_vector_store(&config.storage).await?;
    /// let indexer = RagIndexer::new(&config, store, "handbook.md", &config.embedding.model).await?;
    /// indexer.index_file("uploads/alice/handbook.md").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(
        config: &Config,
        store: Arc<dyn VectorStore>,
        knowledge_base: &str,
        embedding_model: &str,
    ) -> Result<Self> {
        let provider = create_provider(&config.embedding, embedding_model)?;
        Self::with_provider(config, store, provider, knowledge_base).await
    }

    /// Like [`new`](Self::new), with an already constructed provider.
    pub async fn with_provider(
        config: &Config,
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        knowledge_base: &str,
    ) -> Result<Self> {
        let dimension = config.embedding.dimension;
        let embedder = Embedder::new(provider, dimension);
        embedder.verify_dimension().await.map_err(RagError::Dimension)?;

        let index = utils::index_name(knowledge_base);
        store
            .create_index(&index, VECTOR_FIELD, dimension)
            .await
            .map_err(|source| RagError::InitIndex {
                index: index.clone(),
                source,
            })?;
        info!(knowledge_base, index = %index, dimension, "Knowledge base ready");

        let indexer = Indexer::new(
            store,
            index,
            utils::key_prefix(knowledge_base),
            config.rag.batch_size,
            DocumentMapper::new(knowledge_base),
            embedder,
        );

        Ok(Self {
            knowledge_base: knowledge_base.to_string(),
            indexer,
        })
    }

    pub fn knowledge_base(&self) -> &str {
        &self.knowledge_base
    }

    /// Reads `file_path` and stores its whole content as one document.
    ///
    /// Re-indexing a file replaces the previous document of this knowledge base.
    pub async fn index_file(&self, file_path: impl AsRef<Path>) -> Result<()> {
        let path = file_path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| RagError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let document = Document::new(FILE_DOCUMENT_ID, String::from_utf8_lossy(&bytes))
            .with_metadata(SOURCE_KEY, path.to_string_lossy().into_owned());

        self.indexer.store(&[document]).await?;

        info!(knowledge_base = %self.knowledge_base, file = %path.display(), "Indexed file");
        Ok(())
    }
}

/// Deletes a knowledge base and all of its documents.
///
/// Deleting a knowledge base that does not exist returns
/// [`RagError::KnowledgeBaseNotFound`].
pub async fn delete_index(store: &dyn VectorStore, knowledge_base: &str) -> Result<()> {
    let index = utils::index_name(knowledge_base);
    match store.delete_index(&index).await {
        Ok(()) => {
            info!(knowledge_base, index = %index, "Deleted knowledge base");
            Ok(())
        }
        Err(StoreError::IndexNotFound(_)) => {
            Err(RagError::KnowledgeBaseNotFound(knowledge_base.to_string()))
        }
        Err(source) => Err(RagError::DeleteIndex { index, source }),
    }
}

/// Finds the knowledge base of `owner`: the first non-directory entry, by
/// name, in `<uploads_dir>/<owner>`.
pub async fn resolve_owner_knowledge_base(uploads_dir: impl AsRef<Path>, owner: &str) -> Result<String> {
    let owner_dir = uploads_dir.as_ref().join(owner);
    let no_file = || RagError::NoUploadedFile(owner.to_string());

    let mut entries = tokio::fs::read_dir(&owner_dir).await.map_err(|_| no_file())?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|_| no_file())? {
        // Follows symlinks; anything that is not a directory counts as an upload.
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(true);
        if !is_dir {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    debug!(owner, files = names.len(), "Listed uploaded files");
    if names.len() > 1 {
        warn!(owner, using = %names[0], "Several uploaded files, using the first by name");
    }
    names.into_iter().next().ok_or_else(no_file)
}

/// Answers questions against one knowledge base.
#[derive(Clone)]
pub struct RagQuery {
    knowledge_base: String,
    retriever: Retriever,
}

impl RagQuery {
    /// Creates a query for the knowledge base uploaded by `owner`.
    ///
    /// The knowledge base is found with [`resolve_owner_knowledge_base`]
    /// under `config.rag.uploads_dir`; this assumes one uploaded file per
    /// owner. Use [`for_knowledge_base`](Self::for_knowledge_base) to name it
    /// explicitly instead.
    pub async fn new(config: &Config, store: Arc<dyn VectorStore>, owner: &str) -> Result<Self> {
        let provider = create_provider(&config.embedding, &config.embedding.model)?;
        let knowledge_base = resolve_owner_knowledge_base(&config.rag.uploads_dir, owner).await?;
        Ok(Self::for_knowledge_base(config, store, provider, &knowledge_base))
    }

    /// Creates a query for an explicitly named knowledge base.
    pub fn for_knowledge_base(
        config: &Config,
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        knowledge_base: &str,
    ) -> Self {
        let retriever = Retriever::new(
            store,
            Embedder::new(provider, config.embedding.dimension),
            utils::index_name(knowledge_base),
            utils::key_prefix(knowledge_base),
            config.rag.top_k,
            VECTOR_FIELD,
            vec![
                CONTENT_FIELD.to_string(),
                METADATA_FIELD.to_string(),
                DISTANCE_FIELD.to_string(),
            ],
            convert_hit,
        );

        Self {
            knowledge_base: knowledge_base.to_string(),
            retriever,
        }
    }

    pub fn knowledge_base(&self) -> &str {
        &self.knowledge_base
    }

    /// Returns the documents closest to `query`, closest first.
    pub async fn retrieve_documents(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        Ok(self.retriever.retrieve(query).await?)
    }

    /// Retrieves documents for `query` and builds the augmented prompt.
    pub async fn build_prompt(&self, query: &str) -> Result<String> {
        let documents = self.retrieve_documents(query).await?;
        Ok(build_rag_prompt(query, &documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_resolve_owner_picks_first_file_by_name() {
        let uploads = TempDir::new().unwrap();
        let owner_dir = uploads.path().join("alice");
        std::fs::create_dir_all(owner_dir.join("a_subdir")).unwrap();
        std::fs::write(owner_dir.join("zeta.md"), "z").unwrap();
        std::fs::write(owner_dir.join("beta.md"), "b").unwrap();

        let kb = resolve_owner_knowledge_base(uploads.path(), "alice").await.unwrap();
        assert_eq!(kb, "beta.md");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_owner_follows_symlinked_upload() {
        let uploads = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let target = elsewhere.path().join("real.md");
        std::fs::write(&target, "content").unwrap();

        let owner_dir = uploads.path().join("alice");
        std::fs::create_dir_all(&owner_dir).unwrap();
        std::os::unix::fs::symlink(&target, owner_dir.join("linked.md")).unwrap();

        let kb = resolve_owner_knowledge_base(uploads.path(), "alice").await.unwrap();
        assert_eq!(kb, "linked.md");
    }

    #[tokio::test]
    async fn test_resolve_owner_without_files() {
        let uploads = TempDir::new().unwrap();
        std::fs::create_dir_all(uploads.path().join("bob/only_dirs")).unwrap();

        let err = resolve_owner_knowledge_base(uploads.path(), "bob").await.unwrap_err();
        assert!(matches!(err, RagError::NoUploadedFile(owner) if owner == "bob"));

        let err = resolve_owner_knowledge_base(uploads.path(), "carol").await.unwrap_err();
        assert!(matches!(err, RagError::NoUploadedFile(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_knowledge_base() {
        let store = MemoryStore::new();
        let err = delete_index(&store, "never-created.md").await.unwrap_err();
        assert!(matches!(err, RagError::KnowledgeBaseNotFound(kb) if kb == "never-created.md"));
    }
}
