//! watsonx.ai API client module
//!
//! Encapsulates IAM token exchange, text generation and text embeddings
//! against the watsonx.ai REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Embedder, LanguageModel};
use crate::core::config::AppConfig;
use crate::errors::BotError;

const GENERATION_API_VERSION: &str = "2023-05-29";
const EMBEDDINGS_API_VERSION: &str = "2023-10-25";
/// watsonx.ai accepts at most 1000 inputs per embeddings call.
const EMBED_BATCH_SIZE: usize = 1000;
/// Refresh the IAM token this long before it actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// Decoding parameters sent with every generation request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub decoding_method: String,
    pub max_new_tokens: u32,
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            decoding_method: "greedy".to_string(),
            max_new_tokens: 500,
            repetition_penalty: 1.1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    results: Vec<EmbeddingResult>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResult {
    embedding: Vec<f32>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Shared watsonx.ai connection: credentials, project and a cached IAM token.
pub struct WatsonxClient {
    http: Client,
    api_key: String,
    project_id: String,
    base_url: String,
    iam_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl WatsonxClient {
    #[must_use]
    pub fn new(api_key: String, project_id: String, base_url: &str, iam_url: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            api_key,
            project_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            iam_url: iam_url.to_string(),
            token: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.ibm_api_key.clone(),
            config.watsonx_project_id.clone(),
            &config.watsonx_url,
            &config.watsonx_iam_url,
        )
    }

    /// Exchange the API key for a bearer token, reusing it until shortly before expiry.
    async fn bearer_token(&self) -> Result<String, BotError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref()
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.value.clone());
        }

        let resp = self
            .http
            .post(&self.iam_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BotError::HttpError(format!("IAM token request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::LlmError(format!(
                "IAM token exchange failed (status {status}): {body}"
            )));
        }

        let token: IamTokenResponse = resp
            .json()
            .await
            .map_err(|e| BotError::LlmError(format!("Failed to parse IAM token: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        let refresh_at = Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN);
        debug!("Obtained IAM token valid for {}s", lifetime.as_secs());

        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at,
        });
        Ok(token.access_token)
    }

    async fn post_ml(&self, path: &str, version: &str, body: &Value) -> Result<Value, BotError> {
        let token = self.bearer_token().await?;
        let url = format!("{}{}?version={}", self.base_url, path, version);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| BotError::HttpError(format!("watsonx.ai request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(BotError::LlmError(format!(
                "{path} error (status {status}): {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BotError::LlmError(format!("Failed to parse {path} response: {e}")))
    }

    /// Generate text for a single prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply carries no result.
    pub async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BotError> {
        #[cfg(feature = "debug-logs")]
        info!("Using generation prompt:\n{}", prompt);

        #[cfg(not(feature = "debug-logs"))]
        info!(
            "Generating with {} (~{} input tokens)",
            model_id,
            estimate_tokens(prompt)
        );

        let body = json!({
            "model_id": model_id,
            "project_id": self.project_id,
            "input": prompt,
            "parameters": {
                "decoding_method": params.decoding_method,
                "max_new_tokens": params.max_new_tokens,
                "repetition_penalty": params.repetition_penalty,
            }
        });

        let value = self
            .post_ml("/ml/v1/text/generation", GENERATION_API_VERSION, &body)
            .await?;
        let parsed: GenerationResponse = serde_json::from_value(value)
            .map_err(|e| BotError::LlmError(format!("Unexpected generation response: {e}")))?;

        parsed
            .results
            .into_iter()
            .next()
            .map(|r| r.generated_text)
            .ok_or_else(|| BotError::LlmError("No text in generation response".to_string()))
    }

    /// Embed texts in batches, returning one vector per input in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if any batch fails or returns the wrong number of vectors.
    pub async fn embed(
        &self,
        model_id: &str,
        texts: &[String],
        truncate_input_tokens: u32,
    ) -> Result<Vec<Vec<f32>>, BotError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let body = json!({
                "model_id": model_id,
                "project_id": self.project_id,
                "inputs": batch,
                "parameters": {
                    "truncate_input_tokens": truncate_input_tokens,
                    "return_options": { "input_text": true }
                }
            });

            let value = self
                .post_ml("/ml/v1/text/embeddings", EMBEDDINGS_API_VERSION, &body)
                .await?;
            let parsed: EmbeddingsResponse = serde_json::from_value(value)
                .map_err(|e| BotError::LlmError(format!("Unexpected embeddings response: {e}")))?;

            if parsed.results.len() != batch.len() {
                return Err(BotError::LlmError(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    parsed.results.len()
                )));
            }
            vectors.extend(parsed.results.into_iter().map(|r| r.embedding));
        }

        Ok(vectors)
    }
}

/// A generation model bound to a shared [`WatsonxClient`].
pub struct WatsonxLlm {
    client: Arc<WatsonxClient>,
    model_id: String,
    params: GenerationParams,
}

impl WatsonxLlm {
    #[must_use]
    pub fn new(client: Arc<WatsonxClient>, model_id: String) -> Self {
        Self {
            client,
            model_id,
            params: GenerationParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl LanguageModel for WatsonxLlm {
    async fn generate(&self, prompt: &str) -> Result<String, BotError> {
        self.client
            .generate(&self.model_id, prompt, &self.params)
            .await
    }
}

/// An embedding model bound to a shared [`WatsonxClient`].
pub struct WatsonxEmbeddings {
    client: Arc<WatsonxClient>,
    model_id: String,
    truncate_input_tokens: u32,
}

impl WatsonxEmbeddings {
    #[must_use]
    pub fn new(client: Arc<WatsonxClient>, model_id: String) -> Self {
        Self {
            client,
            model_id,
            truncate_input_tokens: 128,
        }
    }
}

#[async_trait]
impl Embedder for WatsonxEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BotError> {
        self.client
            .embed(&self.model_id, texts, self.truncate_input_tokens)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn test_default_generation_params() {
        let params = GenerationParams::default();
        assert_eq!(params.decoding_method, "greedy");
        assert_eq!(params.max_new_tokens, 500);
        assert!((params.repetition_penalty - 1.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = WatsonxClient::new(
            "key".into(),
            "proj".into(),
            "https://us-south.ml.cloud.ibm.com/",
            "https://iam.example/token",
        );
        assert_eq!(client.base_url, "https://us-south.ml.cloud.ibm.com");
    }
}
