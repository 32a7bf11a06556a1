//! tome-core - document indexing and retrieval-augmented prompting
//!
//! Provides the building blocks behind the `tome` CLI:
//! - Embedding provider abstraction (OpenAI-compatible services, Ollama)
//! - RAG pipelines: knowledge-base indexing, similarity retrieval, prompt building
//! - Vector store abstraction (Qdrant, in-memory)
//! - User registration and lookup (SQLite)
//! - Configuration management
//!
//! ## Primary API
//!
//! Index with [`RagIndexer`], query with [`RagQuery`], and turn the results
//! into a prompt with [`build_rag_prompt`].

// Public modules
pub mod config;
pub mod provider;
pub mod rag;
pub mod user;

// Public exports
pub use config::Config;
pub use rag::{build_rag_prompt, delete_index, RagError, RagIndexer, RagQuery, RetrievedDocument};

// Provider exports
pub use provider::{create_provider, EmbeddingProvider, ProviderError};

// User exports
pub use user::{User, UserError, UserService};
