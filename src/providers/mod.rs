use anyhow::{Result, anyhow};
use std::future::Future;
use std::pin::Pin;

mod openai;
mod retry;

pub use openai::OpenAI;

pub type ProviderFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: String,
}

/// The two upstream operations the pipeline depends on: a chat completion
/// returning plain text and an image generation returning raw image bytes.
/// Both are single blocking calls from the pipeline's perspective; only
/// provider-level rate limiting is retried.
pub trait Provider: Clone + Send + Sync {
    fn chat(&self, messages: Vec<Message>) -> ProviderFuture<String>;
    fn generate_image(&self, request: ImageRequest) -> ProviderFuture<Vec<u8>>;
}

pub fn resolve_key(explicit: Option<&str>) -> Result<String> {
    if let Some(key) = explicit {
        let key = key.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    std::env::var("OPENAI_API_KEY")
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| anyhow!("no API key found (set OPENAI_API_KEY or [provider] key)"))
}
