use anyhow::{Context, Result};

use crate::layout::PlacementHint;
use crate::providers::{ImageRequest, Message, Provider};

/// The narrow seams to the language/image models: translation, summarization,
/// placement suggestion, keyword extraction and illustration generation. Each
/// is one prompt, one call; failures propagate to the pipeline unretried.
#[derive(Debug, Clone)]
pub struct Collaborators<P: Provider> {
    provider: P,
    image_size: String,
}

impl<P: Provider> Collaborators<P> {
    pub fn new(provider: P, image_size: impl Into<String>) -> Self {
        Self {
            provider,
            image_size: image_size.into(),
        }
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        self.ask(translate_prompt(text, target_language))
            .await
            .with_context(|| format!("translation to {} failed", target_language))
    }

    pub async fn summarize(&self, text: &str) -> Result<String> {
        self.ask(summarize_prompt(text))
            .await
            .with_context(|| "summarization failed")
    }

    /// Length-bounded summary used for captions that must stay short.
    pub async fn summarize_within(&self, text: &str, letters: usize) -> Result<String> {
        self.ask(short_summary_prompt(text, letters))
            .await
            .with_context(|| "short summarization failed")
    }

    pub async fn extract_keywords(&self, text: &str) -> Result<String> {
        self.ask(keyword_prompt(text))
            .await
            .with_context(|| "keyword extraction failed")
    }

    /// Asks for a caption zone and classifies the free-text answer into the
    /// placement enum; an unrecognized answer lands on center.
    pub async fn suggest_placement(&self, image_description: &str) -> Result<PlacementHint> {
        let answer = self
            .ask(placement_prompt(image_description))
            .await
            .with_context(|| "placement suggestion failed")?;
        Ok(PlacementHint::classify(&answer))
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        self.provider
            .generate_image(ImageRequest {
                prompt: prompt.to_string(),
                size: self.image_size.clone(),
            })
            .await
            .with_context(|| "image generation failed")
    }

    async fn ask(&self, prompt: String) -> Result<String> {
        self.provider.chat(vec![Message::user(prompt)]).await
    }
}

pub fn translate_prompt(text: &str, target_language: &str) -> String {
    format!("Translate this to {}: {}", target_language, text)
}

pub fn summarize_prompt(text: &str) -> String {
    format!("Summarize the following message briefly: {}", text)
}

pub fn short_summary_prompt(text: &str, letters: usize) -> String {
    format!("{}. within {} letters", text, letters)
}

pub fn keyword_prompt(text: &str) -> String {
    format!("Extract important keywords from this message: {}", text)
}

pub fn placement_prompt(image_description: &str) -> String {
    format!(
        "Based on the following image description: '{}', suggest where the text would be most visible (e.g., 'top left', 'center', 'bottom right').",
        image_description
    )
}

/// Theme-driven illustration prompt. The no-text constraint is part of the
/// prompt because the caption is composited afterwards.
pub fn illustration_prompt(theme: &str, painting_style: Option<&str>, instruction: &str) -> String {
    let mut prompt = match painting_style {
        Some(style) if !style.trim().is_empty() => format!(
            "Create an artistic image in the style of {}. The theme is: {}. Exclude all text, letters, and symbols.",
            style.trim(),
            theme
        ),
        _ => format!(
            "Create an artistic illustration for: '{}'. Ensure the illustration contains no text, numbers, or any other written characters.",
            theme
        ),
    };
    let instruction = instruction.trim();
    if !instruction.is_empty() {
        prompt.push_str(&format!(
            " Follow these additional instructions: {}",
            instruction
        ));
    }
    prompt
}

/// Keyword-driven variant of the illustration prompt.
pub fn keyword_illustration_prompt(keywords: &str, instruction: &str) -> String {
    let mut prompt = format!(
        "Create an image based on the following keywords: {}.",
        keywords.trim()
    );
    let instruction = instruction.trim();
    if !instruction.is_empty() {
        prompt.push_str(&format!(" {}.", instruction));
    }
    prompt.push_str(" Ensure the image contains no text.");
    prompt
}
