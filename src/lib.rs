use anyhow::{Result, anyhow};
use std::path::Path;

pub mod collaborators;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod server;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use pipeline::{CaptionArtifacts, CaptionPipeline, CaptionRequest};
pub use providers::{OpenAI, Provider};

/// One-shot invocation options, mirroring the request contract of the HTTP
/// surface.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub title: Option<String>,
    pub instruction: Option<String>,
    pub painting_style: Option<String>,
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub text_color: Option<String>,
    pub outline_color: Option<String>,
    pub position: Option<String>,
    pub use_keywords: bool,
    pub round_trip: bool,
    pub key: Option<String>,
    pub settings_path: Option<String>,
}

/// Runs one caption job from the CLI: the message comes from stdin, the
/// artifact paths and the caption go to stdout.
pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let input = input.unwrap_or_default();
    let message = input.trim();
    if message.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }

    let key = providers::resolve_key(config.key.as_deref().or(settings.api_key.as_deref()))?;
    let mut provider = OpenAI::new(key);
    if let Some(model) = settings.chat_model.as_deref() {
        provider = provider.with_chat_model(model);
    }
    if let Some(model) = settings.image_model.as_deref() {
        provider = provider.with_image_model(model);
    }

    let request = CaptionRequest {
        title: config.title.unwrap_or_default(),
        message: message.to_string(),
        instruction: config.instruction.unwrap_or_default(),
        painting_style: config.painting_style,
        font: config.font,
        font_size: config.font_size,
        text_color: config.text_color,
        outline_color: config.outline_color,
        position: config.position,
        use_keywords: config.use_keywords,
        round_trip: config.round_trip,
    };

    let pipeline = CaptionPipeline::new(provider, settings);
    let artifacts = pipeline.run(request).await?;

    Ok(format!(
        "caption: {}\nplacement: {}\noriginal: {}\nresult: {}",
        artifacts.caption,
        artifacts.placement.as_str(),
        artifacts.original_path.display(),
        artifacts.result_path.display()
    ))
}
