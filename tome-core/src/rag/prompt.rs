//! Retrieval-augmented prompt construction.

use super::types::RetrievedDocument;
use std::fmt::Write;

/// Builds the prompt sent to the downstream language model.
///
/// With no documents the query is returned unchanged. Otherwise every
/// document is listed as `[Document N]: <content>` (N from 1, in input
/// order) inside an instruction to answer only from those documents.
pub fn build_rag_prompt(query: &str, documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return query.to_string();
    }

    let mut context = String::new();
    for (i, doc) in documents.iter().enumerate() {
        let _ = write!(context, "[Document {}]: {}\n\n", i + 1, doc.content);
    }

    format!(
        "Answer the user's question based on the following reference documents. \
If the documents do not contain the relevant information, say explicitly that it could not be found.

Reference documents:
{context}
User question: {query}

Please provide an accurate and complete answer:"
    )
}
