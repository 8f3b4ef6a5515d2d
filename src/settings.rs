use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::render::EncodePolicy;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub public_base_url: String,
    pub output_dir: String,
    pub fonts_dir: String,
    pub default_font: Option<String>,
    pub font_size: f32,
    pub min_font_size: f32,
    pub caption_language: String,
    pub summary_letters: usize,
    pub chat_model: Option<String>,
    pub image_model: Option<String>,
    pub image_size: String,
    pub api_key: Option<String>,
    pub max_kilobytes: usize,
    pub start_quality: u8,
    pub floor_quality: u8,
    pub quality_step: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:5000".to_string(),
            public_base_url: "http://localhost:5000".to_string(),
            output_dir: "static".to_string(),
            fonts_dir: "fonts".to_string(),
            default_font: None,
            font_size: 24.0,
            min_font_size: 10.0,
            caption_language: "Korean".to_string(),
            summary_letters: 20,
            chat_model: None,
            image_model: None,
            image_size: "1024x1024".to_string(),
            api_key: None,
            max_kilobytes: 300,
            start_quality: 95,
            floor_quality: 10,
            quality_step: 5,
        }
    }
}

impl Settings {
    pub fn encode_policy(&self) -> EncodePolicy {
        EncodePolicy {
            max_bytes: self.max_kilobytes * 1024,
            start_quality: self.start_quality,
            floor_quality: self.floor_quality,
            quality_step: self.quality_step,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    output: Option<OutputSettings>,
    font: Option<FontSettings>,
    caption: Option<CaptionSettings>,
    provider: Option<ProviderSettings>,
    encode: Option<EncodeSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    public_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    dir: Option<String>,
    file: Option<String>,
    size: Option<f32>,
    min_size: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct CaptionSettings {
    language: Option<String>,
    summary_letters: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderSettings {
    chat_model: Option<String>,
    image_model: Option<String>,
    image_size: Option<String>,
    key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EncodeSettings {
    max_kilobytes: Option<usize>,
    start_quality: Option<u8>,
    floor_quality: Option<u8>,
    quality_step: Option<u8>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = non_empty(server.addr) {
                self.server_addr = addr;
            }
            if let Some(base) = non_empty(server.public_base_url) {
                self.public_base_url = base.trim_end_matches('/').to_string();
            }
        }
        if let Some(output) = incoming.output {
            if let Some(dir) = non_empty(output.dir) {
                self.output_dir = dir;
            }
        }
        if let Some(font) = incoming.font {
            if let Some(dir) = non_empty(font.dir) {
                self.fonts_dir = dir;
            }
            if let Some(file) = non_empty(font.file) {
                self.default_font = Some(file);
            }
            if let Some(size) = font.size
                && size > 0.0
            {
                self.font_size = size;
            }
            if let Some(size) = font.min_size
                && size > 0.0
            {
                self.min_font_size = size;
            }
        }
        if let Some(caption) = incoming.caption {
            if let Some(language) = non_empty(caption.language) {
                self.caption_language = language;
            }
            if let Some(letters) = caption.summary_letters
                && letters > 0
            {
                self.summary_letters = letters;
            }
        }
        if let Some(provider) = incoming.provider {
            if let Some(model) = non_empty(provider.chat_model) {
                self.chat_model = Some(model);
            }
            if let Some(model) = non_empty(provider.image_model) {
                self.image_model = Some(model);
            }
            if let Some(size) = non_empty(provider.image_size) {
                self.image_size = size;
            }
            if let Some(key) = non_empty(provider.key) {
                self.api_key = Some(key);
            }
        }
        if let Some(encode) = incoming.encode {
            if let Some(kib) = encode.max_kilobytes
                && kib > 0
            {
                self.max_kilobytes = kib;
            }
            if let Some(quality) = encode.start_quality
                && quality > 0
            {
                self.start_quality = quality.min(100);
            }
            if let Some(quality) = encode.floor_quality
                && quality > 0
            {
                self.floor_quality = quality.min(100);
            }
            if let Some(step) = encode.quality_step
                && step > 0
            {
                self.quality_step = step;
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".llm-captioner-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn defaults_match_the_documented_policy() {
        let settings = Settings::default();
        assert_eq!(settings.font_size, 24.0);
        assert_eq!(settings.max_kilobytes, 300);
        assert_eq!(settings.start_quality, 95);
        assert_eq!(settings.floor_quality, 10);
        assert_eq!(settings.quality_step, 5);
        let policy = settings.encode_policy();
        assert_eq!(policy.max_bytes, 300 * 1024);
    }

    #[test]
    fn extra_file_overrides_defaults() {
        with_temp_home(|home| {
            let path = home.join("override.toml");
            fs::write(
                &path,
                r#"
[font]
size = 30.0

[caption]
language = "English"

[encode]
max_kilobytes = 150
"#,
            )
            .expect("write override");
            let settings = load_settings(Some(&path)).expect("load settings");
            assert_eq!(settings.font_size, 30.0);
            assert_eq!(settings.caption_language, "English");
            assert_eq!(settings.max_kilobytes, 150);
            // Untouched keys keep their defaults.
            assert_eq!(settings.quality_step, 5);
        });
    }

    #[test]
    fn blank_strings_do_not_override() {
        with_temp_home(|home| {
            let path = home.join("override.toml");
            fs::write(&path, "[output]\ndir = \"  \"\n").expect("write override");
            let settings = load_settings(Some(&path)).expect("load settings");
            assert_eq!(settings.output_dir, "static");
        });
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        with_temp_home(|_home| {
            let err = load_settings(Some(Path::new("/nonexistent/settings.toml")));
            assert!(err.is_err());
        });
    }

    #[test]
    fn home_settings_file_is_seeded() {
        with_temp_home(|_home| {
            load_settings(None).expect("load settings");
            let seeded = home_dir().expect("home dir").join("settings.toml");
            assert!(seeded.exists());
        });
    }
}
