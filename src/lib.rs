//! tome - document indexing and retrieval-augmented prompting
//!
//! Convenience wrapper that re-exports `tome-core`.
//!
//! # Quick Start
//!
//! ```no_run
//! use tome::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_default();
//! let store = create_vector_store(&config.storage).await?;
//!
//! let indexer = RagIndexer::new(&config, store.clone(), "handbook.md", &config.embedding.model).await?;
//! indexer.index_file("uploads/alice/handbook.md").await?;
//!
//! let query = RagQuery::new(&config, store, "alice").await?;
//! let prompt = query.build_prompt("How many vacation days do I get?").await?;
//! println!("{prompt}");
//! # Ok(())
//! # }
//! ```

// Re-export core
pub use tome_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use tome_core::rag::{create_vector_store, Document, MemoryStore, VectorStore};
    pub use tome_core::*;
}
