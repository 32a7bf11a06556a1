use std::collections::HashMap;

/// Field holding the raw document text.
pub const CONTENT_FIELD: &str = "content";
/// Field holding the document's source label.
pub const METADATA_FIELD: &str = "metadata";
/// Vector field receiving the embedding of [`CONTENT_FIELD`].
pub const VECTOR_FIELD: &str = "vector";
/// Synthetic field stores attach to every search hit.
pub const DISTANCE_FIELD: &str = "distance";
/// Metadata key carrying where a document came from.
pub const SOURCE_KEY: &str = "source";

/// A logical document before it is indexed.
///
/// # Example
///
/// ```no_run
/// # use tome_core::rag::Document;
/// let doc = Document::new("doc_1", "Hello world")
///     .with_metadata("source", "uploads/alice/notes.txt");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `source` metadata entry, or `""` when absent or not a string.
    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }
}

/// One field of an [`IndexRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub value: String,
    /// When set, the vector field that receives the embedding of `value`.
    pub embed_target: Option<String>,
}

impl FieldValue {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            embed_target: None,
        }
    }

    pub fn embedded(value: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            embed_target: Some(target.into()),
        }
    }
}

/// The store-side shape of a document, before embeddings are computed.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub key: String,
    pub fields: HashMap<String, FieldValue>,
}

/// A record ready to be written: plain fields plus computed vectors.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub key: String,
    pub fields: HashMap<String, String>,
    pub vectors: HashMap<String, Vec<f32>>,
}

/// A raw similarity-search hit as returned by a [`VectorStore`](super::VectorStore).
///
/// `fields` only contains the requested return fields, plus
/// [`DISTANCE_FIELD`] when asked for.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub key: String,
    pub fields: HashMap<String, String>,
    pub score: f32,
}

/// A document produced by the retrieval pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
}
