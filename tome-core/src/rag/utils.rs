//! Naming helpers shared by the indexing and retrieval pipelines.

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Name of the store index backing `knowledge_base`.
///
/// Knowledge bases are usually named after an uploaded file, so characters
/// that vector stores reject in collection names are replaced with `_`. A
/// hash of the raw name is appended so distinct knowledge bases never share
/// an index.
pub fn index_name(knowledge_base: &str) -> String {
    let sanitized: String = knowledge_base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let digest = Sha256::digest(knowledge_base.as_bytes());
    let mut suffix = String::with_capacity(16);
    for byte in &digest[..8] {
        let _ = write!(suffix, "{:02x}", byte);
    }

    format!("kb_{}_{}", sanitized, suffix)
}

/// Prefix every record key of `knowledge_base` starts with.
pub fn key_prefix(knowledge_base: &str) -> String {
    format!("{}:", knowledge_base)
}
