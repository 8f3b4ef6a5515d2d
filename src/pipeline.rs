use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::collaborators::{Collaborators, illustration_prompt, keyword_illustration_prompt};
use crate::layout::{
    ColorPair, FontMetrics, PLACEMENT_MARGIN, PlacementHint, fit_text, load_font_metrics,
    resolve_origin, select_colors_for,
};
use crate::providers::Provider;
use crate::render::{Overlay, composite, encode_size_bounded};
use crate::settings::Settings;

/// One caption job. Absent fields fall back to settings defaults; `position`
/// skips the placement collaborator, explicit colors skip the contrast
/// selector.
#[derive(Debug, Clone, Default)]
pub struct CaptionRequest {
    pub title: String,
    pub message: String,
    pub instruction: String,
    pub painting_style: Option<String>,
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub text_color: Option<String>,
    pub outline_color: Option<String>,
    pub position: Option<String>,
    pub use_keywords: bool,
    pub round_trip: bool,
}

/// Terminal artifact description. Both files are already written (and
/// size-bounded) when this is returned.
#[derive(Debug)]
pub struct CaptionArtifacts {
    pub request_id: String,
    pub original_path: PathBuf,
    pub result_path: PathBuf,
    pub caption: String,
    pub placement: PlacementHint,
    pub font_size: f32,
    pub colors: ColorPair,
    pub within_budget: bool,
}

impl CaptionArtifacts {
    pub fn original_file(&self) -> String {
        file_name(&self.original_path)
    }

    pub fn result_file(&self) -> String {
        file_name(&self.result_path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Strictly linear per-request pipeline: caption text, generation prompt,
/// image, contrast, fit, placement, composite, bounded encode, two artifact
/// writes. A collaborator failure aborts the request before any artifact is
/// written; all layout-level failures degrade instead of aborting.
pub struct CaptionPipeline<P: Provider> {
    collaborators: Collaborators<P>,
    settings: Settings,
}

impl<P: Provider> CaptionPipeline<P> {
    pub fn new(provider: P, settings: Settings) -> Self {
        let collaborators = Collaborators::new(provider, settings.image_size.clone());
        Self {
            collaborators,
            settings,
        }
    }

    pub async fn run(&self, request: CaptionRequest) -> Result<CaptionArtifacts> {
        let request_id = request_id(&request.message);

        let explicit_position = request
            .position
            .as_deref()
            .is_some_and(|position| !position.trim().is_empty());
        // The English translation feeds the round-trip caption, the keyword
        // extraction, the default theme and the placement suggestion. Skip the
        // call when the request supplies all of those itself.
        let needs_translation = request.round_trip
            || request.use_keywords
            || request.title.trim().is_empty()
            || !explicit_position;
        let translated = if needs_translation {
            self.collaborators
                .translate(&request.message, "English")
                .await?
        } else {
            String::new()
        };
        let caption = if request.round_trip {
            let summarized = self.collaborators.summarize(&translated).await?;
            self.collaborators
                .translate(&summarized, &self.settings.caption_language)
                .await?
        } else {
            self.collaborators
                .summarize_within(&request.message, self.settings.summary_letters)
                .await?
        };
        info!("caption for {}: {}", request_id, caption);

        let prompt = if request.use_keywords {
            let keywords = self.collaborators.extract_keywords(&translated).await?;
            let instruction = if request.instruction.trim().is_empty() {
                String::new()
            } else {
                self.collaborators
                    .translate(&request.instruction, "English")
                    .await?
            };
            keyword_illustration_prompt(&keywords, &instruction)
        } else {
            let theme = if request.title.trim().is_empty() {
                translated.as_str()
            } else {
                request.title.trim()
            };
            illustration_prompt(theme, request.painting_style.as_deref(), &request.instruction)
        };

        let image_bytes = self.collaborators.generate_image(&prompt).await?;
        let image_mime = infer::get(&image_bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or("image/png");
        let image = image::load_from_memory(&image_bytes)
            .with_context(|| "failed to decode generated image")?
            .to_rgba8();
        let (width, height) = (image.width(), image.height());

        let placement = if explicit_position {
            PlacementHint::classify(request.position.as_deref().unwrap_or_default())
        } else {
            self.collaborators.suggest_placement(&translated).await?
        };

        let colors = if request.text_color.is_some() || request.outline_color.is_some() {
            ColorPair::new(
                request.text_color.as_deref().unwrap_or("black"),
                request.outline_color.as_deref().unwrap_or("white"),
            )
        } else {
            select_colors_for(&image)
        };

        let font = self.resolve_font(request.font.as_deref());
        let start_size = request
            .font_size
            .filter(|size| *size > 0.0)
            .unwrap_or(self.settings.font_size);
        let max_width = width as f32 - PLACEMENT_MARGIN * 2.0;
        let max_height = height as f32 - PLACEMENT_MARGIN * 2.0;
        let fitted = fit_text(
            &caption,
            &font,
            start_size,
            self.settings.min_font_size,
            max_width,
            max_height,
        );
        if !fitted.fits {
            warn!(
                "caption does not fit at the minimum size; rendering oversized ({}x{} block in {}x{})",
                fitted.block.width, fitted.block.height, width, height
            );
        }

        let origin = resolve_origin(
            width,
            height,
            placement,
            fitted.block.width,
            fitted.block.height,
        );

        let overlay = Overlay {
            block: &fitted.block,
            font: &font,
            font_size: fitted.font_size,
            origin,
            colors: &colors,
        };
        let composited = composite(&image_bytes, image_mime, width, height, &overlay)?;

        let policy = self.settings.encode_policy();
        let original = encode_size_bounded(&image, &policy)?;
        let result = encode_size_bounded(&composited, &policy)?;
        if !original.within_budget || !result.within_budget {
            warn!(
                "artifacts for {} exceed the {}KiB budget at the quality floor",
                request_id, self.settings.max_kilobytes
            );
        }

        let output_dir = Path::new(&self.settings.output_dir);
        let original_path = write_artifact(
            output_dir,
            &format!("{}-original.jpg", request_id),
            &original.bytes,
        )?;
        let result_path = write_artifact(
            output_dir,
            &format!("{}-result.jpg", request_id),
            &result.bytes,
        )?;
        info!(
            "wrote {} ({} bytes, q{}) and {} ({} bytes, q{})",
            original_path.display(),
            original.bytes.len(),
            original.quality,
            result_path.display(),
            result.bytes.len(),
            result.quality
        );

        Ok(CaptionArtifacts {
            request_id,
            original_path,
            result_path,
            caption,
            placement,
            font_size: fitted.font_size,
            colors,
            within_budget: original.within_budget && result.within_budget,
        })
    }

    /// Loads the requested font file from the fonts directory, degrading to
    /// the built-in estimated metrics when it cannot be read or parsed.
    fn resolve_font(&self, requested: Option<&str>) -> FontMetrics {
        let name = requested
            .filter(|name| !name.trim().is_empty())
            .or(self.settings.default_font.as_deref());
        let Some(name) = name else {
            return FontMetrics::estimated();
        };
        let path = Path::new(&self.settings.fonts_dir).join(name.trim());
        match load_font_metrics(&path) {
            Ok(metrics) => metrics,
            Err(err) => {
                warn!("{}; using the built-in fallback font", err);
                FontMetrics::estimated()
            }
        }
    }
}

/// Unique artifact identity per request so concurrent requests never race on
/// the same output names.
fn request_id(message: &str) -> String {
    let stamp = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    let digest = md5::compute(format!("{}|{}", message, stamp));
    format!("{:x}", digest)[..12].to_string()
}

/// Writes through a temp file in the same directory and renames into place,
/// so a failed request never leaves a half-written artifact behind.
fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let file = tempfile::Builder::new()
        .prefix(".caption-")
        .tempfile_in(dir)
        .with_context(|| "failed to create artifact temp file")?;
    std::fs::write(file.path(), bytes).with_context(|| "failed to write artifact")?;
    let path = dir.join(name);
    file.persist(&path)
        .map_err(|err| anyhow!("failed to persist artifact: {} ({})", path.display(), err))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ImageRequest, Message, ProviderFuture};
    use anyhow::anyhow;
    use image::Rgba;
    use std::io::Cursor;

    #[derive(Clone)]
    struct MockProvider {
        fail_generation: bool,
        fail_translation: bool,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                fail_generation: false,
                fail_translation: false,
            }
        }
    }

    impl crate::providers::Provider for MockProvider {
        fn chat(&self, messages: Vec<Message>) -> ProviderFuture<String> {
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let fail_translation = self.fail_translation;
            Box::pin(async move {
                if fail_translation && prompt.starts_with("Translate this to") {
                    return Err(anyhow!("translation unavailable"));
                }
                let reply = if prompt.starts_with("Translate this to English:") {
                    "a calm sea at dawn"
                } else if prompt.starts_with("Translate this to Korean:") {
                    "새벽의 고요한 바다"
                } else if prompt.starts_with("Summarize the following message briefly:") {
                    "calm sea"
                } else if prompt.contains("within") {
                    "calm sea"
                } else if prompt.starts_with("Based on the following image description:") {
                    "I would suggest the bottom right corner"
                } else if prompt.starts_with("Extract important keywords") {
                    "sea, dawn"
                } else {
                    "center"
                };
                Ok(reply.to_string())
            })
        }

        fn generate_image(&self, _request: ImageRequest) -> ProviderFuture<Vec<u8>> {
            let fail = self.fail_generation;
            Box::pin(async move {
                if fail {
                    return Err(anyhow!("image generation failed"));
                }
                let image = image::RgbaImage::from_pixel(64, 64, Rgba([20, 20, 40, 255]));
                let mut bytes = Vec::new();
                image::DynamicImage::ImageRgba8(image)
                    .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                    .expect("encode png");
                Ok(bytes)
            })
        }
    }

    fn settings_for(dir: &Path) -> Settings {
        Settings {
            output_dir: dir.to_string_lossy().to_string(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn round_trip_request_produces_both_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = CaptionPipeline::new(MockProvider::new(), settings_for(dir.path()));
        let artifacts = pipeline
            .run(CaptionRequest {
                message: "긴 응원의 메시지".to_string(),
                round_trip: true,
                ..CaptionRequest::default()
            })
            .await
            .expect("pipeline run");

        assert_eq!(artifacts.caption, "새벽의 고요한 바다");
        assert_eq!(artifacts.placement, PlacementHint::BottomRight);
        assert!(artifacts.original_path.exists());
        assert!(artifacts.result_path.exists());
        assert!(artifacts.within_budget);
        assert!(artifacts.result_file().ends_with("-result.jpg"));
        // Dark base image gets white text.
        assert_eq!(artifacts.colors, ColorPair::new("white", "black"));
    }

    #[tokio::test]
    async fn explicit_position_and_colors_skip_the_collaborators() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = CaptionPipeline::new(MockProvider::new(), settings_for(dir.path()));
        let artifacts = pipeline
            .run(CaptionRequest {
                message: "메시지".to_string(),
                position: Some("top left".to_string()),
                text_color: Some("red".to_string()),
                ..CaptionRequest::default()
            })
            .await
            .expect("pipeline run");

        assert_eq!(artifacts.placement, PlacementHint::TopLeft);
        assert_eq!(artifacts.colors, ColorPair::new("red", "white"));
        assert_eq!(artifacts.caption, "calm sea");
    }

    #[tokio::test]
    async fn generation_failure_leaves_no_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = MockProvider {
            fail_generation: true,
            ..MockProvider::new()
        };
        let pipeline = CaptionPipeline::new(provider, settings_for(dir.path()));
        let err = pipeline
            .run(CaptionRequest {
                message: "메시지".to_string(),
                ..CaptionRequest::default()
            })
            .await;
        assert!(err.is_err());
        let leftovers = std::fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn titled_and_positioned_request_needs_no_translation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = MockProvider {
            fail_translation: true,
            ..MockProvider::new()
        };
        let pipeline = CaptionPipeline::new(provider, settings_for(dir.path()));
        let artifacts = pipeline
            .run(CaptionRequest {
                title: "고요한 바다".to_string(),
                message: "메시지".to_string(),
                position: Some("center".to_string()),
                ..CaptionRequest::default()
            })
            .await
            .expect("pipeline run");

        assert_eq!(artifacts.placement, PlacementHint::Center);
        assert_eq!(artifacts.caption, "calm sea");
    }

    #[tokio::test]
    async fn distinct_requests_get_distinct_artifact_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = CaptionPipeline::new(MockProvider::new(), settings_for(dir.path()));
        let request = CaptionRequest {
            message: "같은 메시지".to_string(),
            ..CaptionRequest::default()
        };
        let first = pipeline.run(request.clone()).await.expect("first run");
        let second = pipeline.run(request).await.expect("second run");
        assert_ne!(first.request_id, second.request_id);
        assert!(first.result_path.exists());
        assert!(second.result_path.exists());
    }
}
