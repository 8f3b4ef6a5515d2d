use crate::pipeline::{CaptionPipeline, CaptionRequest};
use crate::providers::{self, OpenAI};

use super::models::{GenerateRequest, GenerateResponse};
use super::state::ServerState;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: axum::http::StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: axum::http::StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{:#}", err),
        }
    }
}

pub(crate) async fn generate_request(
    state: &ServerState,
    request: GenerateRequest,
) -> Result<GenerateResponse, ServerError> {
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .ok_or_else(|| ServerError::bad_request("message is required"))?
        .to_string();

    let settings = state.settings.clone();
    let key = providers::resolve_key(settings.api_key.as_deref())
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let mut provider = OpenAI::new(key);
    if let Some(model) = settings.chat_model.as_deref() {
        provider = provider.with_chat_model(model);
    }
    if let Some(model) = settings.image_model.as_deref() {
        provider = provider.with_image_model(model);
    }

    let caption_request = CaptionRequest {
        title: request.title.unwrap_or_default(),
        message,
        instruction: request.instruction.unwrap_or_default(),
        painting_style: request.painting_style,
        font: request.font,
        font_size: request.font_size,
        text_color: request.text_color,
        outline_color: request.border_color,
        position: request.position,
        use_keywords: request.use_keywords.unwrap_or(false),
        round_trip: request.round_trip.unwrap_or(false),
    };

    let base = state.settings.public_base_url.clone();
    let pipeline = CaptionPipeline::new(provider, settings);
    let artifacts = pipeline.run(caption_request).await?;

    Ok(GenerateResponse {
        image_url: format!("{}/static/{}", base, artifacts.result_file()),
        original_url: format!("{}/static/{}", base, artifacts.original_file()),
        caption: artifacts.caption,
    })
}
