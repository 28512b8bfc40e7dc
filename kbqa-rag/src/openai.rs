//! OpenAI-compatible embedding provider.
//!
//! Only available with the `openai` feature. Any server exposing
//! `POST {base}/embeddings` in the OpenAI shape can be used; self-hosted
//! servers that need no key are built with [`OpenAIEmbeddingProvider::local`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "OpenAI";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
/// Output width of `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

fn failure(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
}

/// An [`EmbeddingProvider`] speaking the OpenAI embeddings protocol.
///
/// ```rust,ignore
/// use kbqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let remote = OpenAIEmbeddingProvider::from_env()?;
/// let local = OpenAIEmbeddingProvider::local("http://localhost:11434/v1")
///     .with_model("nomic-embed-text")
///     .with_dimensions(768);
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    dimensions: usize,
    /// Sent as `dimensions` so the server truncates its output.
    requested_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Provider for api.openai.com authenticated with `api_key`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(failure("API key must not be empty"));
        }
        let mut provider = Self::local(OPENAI_BASE_URL);
        provider.api_key = Some(api_key);
        Ok(provider)
    }

    /// Provider keyed from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| failure("OPENAI_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Unauthenticated provider for a self-hosted server.
    pub fn local(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            base_url: String::new(),
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            requested_dimensions: None,
        }
        .with_base_url(base_url)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Ask the server for `dims`-wide vectors; also what [`dimensions`](EmbeddingProvider::dimensions) reports.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.requested_dimensions = Some(dims);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl EmbeddingsResponse {
    /// Vectors in input order; servers may answer out of order.
    fn into_vectors(mut self, expected: usize) -> Result<Vec<Vec<f32>>> {
        if self.data.len() != expected {
            return Err(failure(format!(
                "server returned {} embeddings for {expected} inputs",
                self.data.len()
            )));
        }
        self.data.sort_by_key(|item| item.index);
        Ok(self.data.into_iter().map(|item| item.embedding).collect())
    }
}

/// Prefer the server's `error.message` over the raw body.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ApiErrorBody>(&body).map(|b| b.error.message).unwrap_or(body)
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| failure("server returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = PROVIDER, model = %self.model, batch_size = texts.len(), "requesting embeddings");

        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions,
        };
        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "embedding request failed");
            failure(format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(provider = PROVIDER, %status, "embedding request rejected");
            return Err(failure(format!("server returned {status}: {detail}")));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("failed to parse response: {e}")))?;
        parsed.into_vectors(texts.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
