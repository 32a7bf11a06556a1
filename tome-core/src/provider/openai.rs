//! OpenAI-compatible embedding provider.
//!
//! Works against any service exposing `POST {base_url}/embeddings` with the
//! OpenAI request/response shape (OpenAI itself, Volcengine Ark, vLLM, ...).

use super::types::*;
use async_trait::async_trait;
use serde::Deserialize;

/// OpenAI-compatible HTTP embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a provider for `base_url`, authenticating with a bearer `api_key`.
    ///
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let response = self.http_client
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(ProviderError::Api { status, body });
        }

        let mut embed_response = response.json::<OpenAiEmbedResponse>().await?;

        if embed_response.data.len() != texts.len() {
            return Err(ProviderError::Other(format!(
                "requested {} embeddings, got {}",
                texts.len(),
                embed_response.data.len()
            )));
        }

        // The API does not promise to return items in input order.
        embed_response.data.sort_by_key(|d| d.index);

        Ok(embed_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_sends_bearer_and_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v3/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "model": "text-embedding-3-small",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
                ],
                "usage": {"prompt_tokens": 4, "total_tokens": 4}
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(
            format!("{}/api/v3/", server.uri()),
            "test-key",
            "text-embedding-3-small",
        );
        let vectors = provider
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(provider.model(), "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_embed_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(server.uri(), "bad-key", "m");
        let err = provider.embed(&["x".to_string()]).await.unwrap_err();

        assert!(matches!(err, ProviderError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_embed_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": []
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(server.uri(), "key", "m");
        let err = provider.embed(&["x".to_string()]).await.unwrap_err();

        assert!(matches!(err, ProviderError::Other(_)));
    }
}
