//! All model-backed functionality: text generation, embeddings, prompts

pub mod client;
pub mod prompts;

use async_trait::async_trait;

use crate::errors::BotError;

// Re-export main types for convenience
pub use client::{GenerationParams, WatsonxClient, WatsonxEmbeddings, WatsonxLlm, estimate_tokens};

/// A hosted text-generation model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BotError>;
}

/// A hosted embedding model. Returns one vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BotError>;
}
