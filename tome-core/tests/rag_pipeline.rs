use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tome_core::config::{Config, ProviderKind};
use tome_core::provider::{self, EmbeddingProvider, OpenAiProvider, ProviderError};
use tome_core::rag::{
    build_rag_prompt, delete_index, resolve_owner_knowledge_base, utils, MemoryStore, RagError,
    RagIndexer, RagQuery, RetrieverError, StoreError, VectorStore, DISTANCE_FIELD, METADATA_FIELD,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOPICS: [&str; 3] = ["vacation", "refund", "security"];

/// Embeds text as keyword counts plus a constant component.
struct KeywordProvider;

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    async fn embed(&self, texts: &[String]) -> provider::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut vector: Vec<f32> = TOPICS
                    .iter()
                    .map(|topic| lower.matches(topic).count() as f32)
                    .collect();
                vector.push(0.1);
                vector
            })
            .collect())
    }

    fn model(&self) -> &str {
        "keyword"
    }
}

fn test_config(uploads_dir: &Path, dimension: usize) -> Config {
    let mut config = Config::default();
    config.embedding.dimension = dimension;
    config.rag.uploads_dir = uploads_dir.to_string_lossy().into_owned();
    config
}

fn upload(uploads_dir: &Path, owner: &str, name: &str, content: &str) -> std::path::PathBuf {
    let dir = uploads_dir.join(owner);
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join(name);
    std::fs::write(&file, content).unwrap();
    file
}

#[tokio::test]
async fn test_index_query_delete_round_trip() {
    let tmp = TempDir::new().unwrap();
    let uploads = tmp.path().join("uploads");
    let content = "Vacation policy: every employee gets 25 vacation days per year.";
    let file = upload(&uploads, "alice", "handbook.md", content);

    let config = test_config(&uploads, 4);
    let store = Arc::new(MemoryStore::new());
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(KeywordProvider);

    let indexer = RagIndexer::with_provider(&config, store.clone(), provider.clone(), "handbook.md")
        .await
        .unwrap();
    indexer.index_file(&file).await.unwrap();

    let kb = resolve_owner_knowledge_base(&config.rag.uploads_dir, "alice").await.unwrap();
    assert_eq!(kb, "handbook.md");

    let query = RagQuery::for_knowledge_base(&config, store.clone(), provider, &kb);
    let docs = query.retrieve_documents("How many vacation days?").await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "doc_1");
    assert_eq!(docs[0].content, content);
    assert_eq!(docs[0].metadata[METADATA_FIELD], file.to_string_lossy());
    assert!(docs[0].metadata.contains_key(DISTANCE_FIELD));

    let prompt = build_rag_prompt("How many vacation days?", &docs);
    assert!(prompt.contains("[Document 1]: Vacation policy"));
    assert!(prompt.contains("How many vacation days?"));
    assert_eq!(query.build_prompt("How many vacation days?").await.unwrap(), prompt);

    delete_index(store.as_ref(), "handbook.md").await.unwrap();
    assert!(!store.index_exists(&utils::index_name("handbook.md")).await.unwrap());

    let err = delete_index(store.as_ref(), "handbook.md").await.unwrap_err();
    assert!(matches!(err, RagError::KnowledgeBaseNotFound(_)));

    let err = query.retrieve_documents("vacation").await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Retrieval(RetrieverError::Store(StoreError::IndexNotFound(_)))
    ));
}

#[tokio::test]
async fn test_dimension_mismatch_creates_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), 8);
    let store = Arc::new(MemoryStore::new());

    let err = RagIndexer::with_provider(&config, store.clone(), Arc::new(KeywordProvider), "notes.txt")
        .await
        .err()
        .unwrap();

    assert!(matches!(err, RagError::Dimension(_)));
    assert!(!store.index_exists(&utils::index_name("notes.txt")).await.unwrap());
}

#[tokio::test]
async fn test_reindexing_replaces_document() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), 4);
    let store = Arc::new(MemoryStore::new());
    let file = upload(tmp.path(), "bob", "faq.txt", "refund within 30 days");

    let indexer = RagIndexer::with_provider(&config, store.clone(), Arc::new(KeywordProvider), "faq.txt")
        .await
        .unwrap();
    indexer.index_file(&file).await.unwrap();

    std::fs::write(&file, "refund within 14 days").unwrap();
    indexer.index_file(&file).await.unwrap();

    assert_eq!(store.count(&utils::index_name("faq.txt")).await.unwrap(), 1);

    let query = RagQuery::for_knowledge_base(&config, store, Arc::new(KeywordProvider), "faq.txt");
    let docs = query.retrieve_documents("refund").await.unwrap();
    assert_eq!(docs[0].content, "refund within 14 days");
}

#[tokio::test]
async fn test_knowledge_bases_are_isolated() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), 4);
    let store = Arc::new(MemoryStore::new());
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(KeywordProvider);

    let hr = upload(tmp.path(), "carol", "hr.md", "vacation vacation vacation");
    let sec = upload(tmp.path(), "dave", "security.md", "security checklist");

    for (kb, file) in [("hr.md", &hr), ("security.md", &sec)] {
        RagIndexer::with_provider(&config, store.clone(), provider.clone(), kb)
            .await
            .unwrap()
            .index_file(file)
            .await
            .unwrap();
    }

    let query = RagQuery::for_knowledge_base(&config, store, provider, "security.md");
    let docs = query.retrieve_documents("vacation").await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "security checklist");
}

#[tokio::test]
async fn test_index_missing_file() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), 4);
    let store = Arc::new(MemoryStore::new());

    let indexer = RagIndexer::with_provider(&config, store, Arc::new(KeywordProvider), "gone.txt")
        .await
        .unwrap();
    let err = indexer.index_file(tmp.path().join("gone.txt")).await.unwrap_err();

    assert!(matches!(err, RagError::ReadFile { .. }));
}

#[tokio::test]
async fn test_empty_knowledge_base_yields_plain_question() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), 4);
    let store = Arc::new(MemoryStore::new());
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(KeywordProvider);

    RagIndexer::with_provider(&config, store.clone(), provider.clone(), "empty.md")
        .await
        .unwrap();

    let query = RagQuery::for_knowledge_base(&config, store, provider, "empty.md");
    assert!(query.retrieve_documents("anything").await.unwrap().is_empty());
    assert_eq!(query.build_prompt("anything").await.unwrap(), "anything");
}

#[tokio::test]
async fn test_round_trip_over_http_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.3, 0.4, 0.5]}]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), 3);
    let store = Arc::new(MemoryStore::new());
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(OpenAiProvider::new(server.uri(), "test-key", "test-embedding"));
    let file = upload(tmp.path(), "erin", "notes.txt", "meeting notes");

    // probe, document, query
    let indexer = RagIndexer::with_provider(&config, store.clone(), provider.clone(), "notes.txt")
        .await
        .unwrap();
    indexer.index_file(&file).await.unwrap();

    let query = RagQuery::for_knowledge_base(&config, store, provider, "notes.txt");
    let docs = query.retrieve_documents("notes?").await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "doc_1");
    assert_eq!(docs[0].content, "meeting notes");
}

#[tokio::test]
async fn test_similar_names_keep_separate_indexes() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), 4);
    let store = Arc::new(MemoryStore::new());
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(KeywordProvider);

    let handbook = upload(tmp.path(), "alice", "手册.md", "HANDBOOK vacation");
    let guide = upload(tmp.path(), "bob", "指南.md", "GUIDE vacation");

    for (kb, file) in [("手册.md", &handbook), ("指南.md", &guide)] {
        RagIndexer::with_provider(&config, store.clone(), provider.clone(), kb)
            .await
            .unwrap()
            .index_file(file)
            .await
            .unwrap();
    }

    let query = RagQuery::for_knowledge_base(&config, store.clone(), provider, "指南.md");
    let docs = query.retrieve_documents("vacation").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "doc_1");
    assert_eq!(docs[0].content, "GUIDE vacation");

    delete_index(store.as_ref(), "手册.md").await.unwrap();

    let docs = query.retrieve_documents("vacation").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "GUIDE vacation");
}

#[tokio::test]
async fn test_config_driven_round_trip_with_ollama() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.2, 0.4, 0.6]]
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let uploads = tmp.path().join("uploads");
    let file = upload(&uploads, "alice", "handbook.md", "Remote work is allowed two days a week.");

    let mut config = test_config(&uploads, 3);
    config.embedding.provider = ProviderKind::Ollama;
    config.embedding.base_url = server.uri();
    config.embedding.model = "nomic-embed-text".to_string();
    let store: Arc<dyn VectorStore> = Arc::new(MemoryStore::new());

    let indexer = RagIndexer::new(&config, store.clone(), "handbook.md", &config.embedding.model)
        .await
        .unwrap();
    indexer.index_file(&file).await.unwrap();

    let query = RagQuery::new(&config, store, "alice").await.unwrap();
    assert_eq!(query.knowledge_base(), "handbook.md");

    let docs = query.retrieve_documents("remote work?").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "doc_1");
    assert_eq!(docs[0].content, "Remote work is allowed two days a week.");
}

#[tokio::test]
async fn test_missing_api_key_surfaces_provider_error() {
    let tmp = TempDir::new().unwrap();
    upload(tmp.path(), "alice", "handbook.md", "text");

    let mut config = test_config(tmp.path(), 4);
    config.embedding.provider = ProviderKind::OpenAi;
    config.embedding.api_key_env = "TOME_INTEGRATION_KEY_NEVER_SET".to_string();
    let store: Arc<dyn VectorStore> = Arc::new(MemoryStore::new());

    let err = RagIndexer::new(&config, store.clone(), "handbook.md", "any-model")
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RagError::Provider(ProviderError::MissingApiKey(ref name)) if name == "TOME_INTEGRATION_KEY_NEVER_SET"
    ));
    assert!(!store.index_exists(&utils::index_name("handbook.md")).await.unwrap());

    let err = RagQuery::new(&config, store, "alice").await.err().unwrap();
    assert!(matches!(err, RagError::Provider(ProviderError::MissingApiKey(_))));
}
