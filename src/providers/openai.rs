use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;

use super::retry::{
    RATE_LIMIT_BASE_DELAY, RATE_LIMIT_MAX_RETRIES, is_rate_limited, retry_after, wait_with_backoff,
};
use super::{ImageRequest, Message, Provider, ProviderFuture};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub(crate) const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

#[derive(Debug, Clone)]
pub struct OpenAI {
    key: String,
    chat_model: String,
    image_model: String,
}

impl OpenAI {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.chat_model = model;
        }
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.image_model = model;
        }
        self
    }
}

impl Provider for OpenAI {
    fn chat(&self, messages: Vec<Message>) -> ProviderFuture<String> {
        let provider = self.clone();
        Box::pin(async move { chat_completion(provider, messages).await })
    }

    fn generate_image(&self, request: ImageRequest) -> ProviderFuture<Vec<u8>> {
        let provider = self.clone();
        Box::pin(async move { image_generation(provider, request).await })
    }
}

fn base_url() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

async fn chat_completion(provider: OpenAI, messages: Vec<Message>) -> Result<String> {
    let client = reqwest::Client::new();
    let url = format!("{}/chat/completions", base_url());

    let messages = messages
        .iter()
        .map(|message| json!({"role": message.role.as_str(), "content": message.content}))
        .collect::<Vec<_>>();
    let body = json!({
        "model": provider.chat_model,
        "messages": messages,
    });

    let mut attempt = 0usize;
    let mut delay = RATE_LIMIT_BASE_DELAY;
    loop {
        attempt += 1;
        let response = client
            .post(&url)
            .bearer_auth(provider.key.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return extract_chat_content(&text);
        }
        if is_rate_limited(status, &text) && attempt < RATE_LIMIT_MAX_RETRIES {
            delay = wait_with_backoff("chat completion", attempt, delay, retry_after).await;
            continue;
        }
        return Err(anyhow!(
            "OpenAI API error ({}): {}",
            status,
            extract_openai_error(&text).unwrap_or(text)
        ));
    }
}

async fn image_generation(provider: OpenAI, request: ImageRequest) -> Result<Vec<u8>> {
    let client = reqwest::Client::new();
    let url = format!("{}/images/generations", base_url());

    let body = json!({
        "model": provider.image_model,
        "prompt": request.prompt,
        "n": 1,
        "size": request.size,
        "response_format": "b64_json",
    });

    let mut attempt = 0usize;
    let mut delay = RATE_LIMIT_BASE_DELAY;
    loop {
        attempt += 1;
        let response = client
            .post(&url)
            .bearer_auth(provider.key.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return extract_image_bytes(&client, &text).await;
        }
        if is_rate_limited(status, &text) && attempt < RATE_LIMIT_MAX_RETRIES {
            delay = wait_with_backoff("image generation", attempt, delay, retry_after).await;
            continue;
        }
        return Err(anyhow!(
            "OpenAI API error ({}): {}",
            status,
            extract_openai_error(&text).unwrap_or(text)
        ));
    }
}

fn extract_chat_content(text: &str) -> Result<String> {
    let payload: ChatResponse =
        serde_json::from_str(text).with_context(|| "failed to parse OpenAI chat response JSON")?;
    let content = payload
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .ok_or_else(|| anyhow!("no content returned from OpenAI"))?;
    Ok(content.trim().to_string())
}

/// Prefers the inline base64 payload; some models only hand back a URL, in
/// which case the image is fetched in a second request.
async fn extract_image_bytes(client: &reqwest::Client, text: &str) -> Result<Vec<u8>> {
    let payload: ImagesResponse =
        serde_json::from_str(text).with_context(|| "failed to parse OpenAI images response JSON")?;
    let datum = payload
        .data
        .first()
        .ok_or_else(|| anyhow!("no image returned from OpenAI"))?;
    if let Some(b64) = datum.b64_json.as_deref() {
        return BASE64
            .decode(b64)
            .with_context(|| "failed to decode generated image base64");
    }
    if let Some(url) = datum.url.as_deref() {
        let response = client
            .get(url)
            .send()
            .await
            .with_context(|| "failed to download generated image")?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "generated image download failed ({})",
                response.status()
            ));
        }
        let bytes = response.bytes().await?;
        return Ok(bytes.to_vec());
    }
    Err(anyhow!("image response carries neither b64_json nor url"))
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let mut parts = Vec::new();
    if let Some(message) = error.message
        && !message.trim().is_empty()
    {
        parts.push(message);
    }
    if let Some(kind) = error.kind
        && !kind.trim().is_empty()
    {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = error.code
        && !code.trim().is_empty()
    {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        Some("unknown error".to_string())
    } else {
        Some(parts.join(" | "))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_content_is_extracted_and_trimmed() {
        let payload = r#"{"choices":[{"message":{"role":"assistant","content":"  bottom right \n"}}]}"#;
        assert_eq!(extract_chat_content(payload).unwrap(), "bottom right");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let payload = r#"{"choices":[]}"#;
        assert!(extract_chat_content(payload).is_err());
    }

    #[test]
    fn api_error_body_is_formatted() {
        let body = r#"{"error":{"message":"Billing hard limit","type":"insufficient_quota","code":"quota_exceeded"}}"#;
        let formatted = extract_openai_error(body).unwrap();
        assert_eq!(
            formatted,
            "Billing hard limit | type: insufficient_quota | code: quota_exceeded"
        );
    }

    #[tokio::test]
    async fn image_bytes_prefer_the_base64_payload() {
        let client = reqwest::Client::new();
        let payload = r#"{"data":[{"b64_json":"aGVsbG8="}]}"#;
        let bytes = extract_image_bytes(&client, payload).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn image_response_without_payload_is_an_error() {
        let client = reqwest::Client::new();
        let payload = r#"{"data":[{}]}"#;
        assert!(extract_image_bytes(&client, payload).await.is_err());
    }
}
