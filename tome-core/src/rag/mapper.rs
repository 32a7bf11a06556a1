//! Mapping of documents onto the vector store's record shape.

use super::types::{Document, FieldValue, IndexRecord, CONTENT_FIELD, METADATA_FIELD, VECTOR_FIELD};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MapperError {
    #[error("document has no id")]
    MissingId,
}

/// Maps documents of one knowledge base to [`IndexRecord`]s.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    knowledge_base: String,
}

impl DocumentMapper {
    pub fn new(knowledge_base: impl Into<String>) -> Self {
        Self {
            knowledge_base: knowledge_base.into(),
        }
    }

    pub fn knowledge_base(&self) -> &str {
        &self.knowledge_base
    }

    /// Builds the record for `document`.
    ///
    /// The key is `{knowledge_base}:{document.id}`. `content` is marked for
    /// embedding into [`VECTOR_FIELD`]; `source_label` is kept verbatim in the
    /// `metadata` field and is never embedded.
    pub fn map(&self, document: &Document, source_label: &str) -> Result<IndexRecord, MapperError> {
        if document.id.is_empty() {
            return Err(MapperError::MissingId);
        }

        let mut fields = HashMap::with_capacity(2);
        fields.insert(
            CONTENT_FIELD.to_string(),
            FieldValue::embedded(document.content.clone(), VECTOR_FIELD),
        );
        fields.insert(METADATA_FIELD.to_string(), FieldValue::plain(source_label));

        Ok(IndexRecord {
            key: format!("{}:{}", self.knowledge_base, document.id),
            fields,
        })
    }
}
