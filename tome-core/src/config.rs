use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole tome stack.
///
/// Covers the embedding provider, the RAG pipelines, the vector store
/// connection and the user database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Which embedding backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible `/embeddings` endpoint (OpenAI, Ark, vLLM, ...)
    OpenAi,
    /// A local Ollama server
    Ollama,
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::OpenAi
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    pub base_url: String,
    /// Model used for queries, and for indexing when no model is given explicitly
    pub model: String,
    /// Vector dimension the knowledge bases are created with.
    /// Must equal the model's actual output length.
    pub dimension: usize,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: "https://ark.cn-beijing.volces.com/api/v3".to_string(),
            model: "doubao-embedding-text-240715".to_string(),
            dimension: 2560,
            api_key_env: default_api_key_env(),
        }
    }
}

/// Configuration for indexing and retrieval behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Number of documents embedded and written per store round-trip
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of results to return from similarity searches
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Root directory holding one sub-directory of uploaded files per owner
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
}

fn default_batch_size() -> usize {
    10
}

fn default_top_k() -> usize {
    5
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            top_k: default_top_k(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

/// Vector database storage mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StorageMode {
    /// In-process store, lost on exit
    Memory,
    /// gRPC storage - connect to an external Qdrant server
    Grpc { url: String },
}

impl Default for StorageMode {
    fn default() -> Self {
        Self::Grpc {
            url: "http://localhost:6334".to_string(),
        }
    }
}

/// Vector store connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub storage_mode: StorageMode,
}

/// Relational database settings for the user registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tome.db?mode=rwc".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }

    /// Rejects values the pipelines cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dimension must be greater than zero".to_string(),
            ));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigError::Invalid("embedding.model is empty".to_string()));
        }
        if self.rag.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "rag.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::Invalid(
                "rag.top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
