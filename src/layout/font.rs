use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;
use ttf_parser::name_id;

/// Glyph metrics for a single face, loaded once and shared. When no font file
/// is available the metrics degrade to a per-script width estimate so layout
/// still produces usable numbers.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    data: Option<Arc<Vec<u8>>>,
    face_index: u32,
    units_per_em: u16,
    space_advance: u16,
    ascent: i16,
    descent: i16,
    line_gap: i16,
    family: Option<String>,
}

impl FontMetrics {
    /// Built-in fallback used when the requested font cannot be loaded.
    pub fn estimated() -> Self {
        Self {
            data: None,
            face_index: 0,
            units_per_em: 1000,
            space_advance: 250,
            ascent: 800,
            descent: -200,
            line_gap: 100,
            family: None,
        }
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref().map(|data| data.as_slice())
    }

    /// Pixel width of a single line of text at the given size.
    pub fn measure_width(&self, text: &str, font_size: f32) -> f32 {
        if let Some(data) = self.data.as_deref() {
            if let Ok(face) = Face::parse(data, self.face_index) {
                let mut advance = 0u32;
                for ch in text.chars() {
                    if ch == '\n' {
                        continue;
                    }
                    if ch == ' ' {
                        advance = advance.saturating_add(self.space_advance as u32);
                        continue;
                    }
                    if let Some(glyph) = face.glyph_index(ch) {
                        let glyph_advance =
                            face.glyph_hor_advance(glyph).unwrap_or(self.space_advance);
                        advance = advance.saturating_add(glyph_advance as u32);
                    } else {
                        advance = advance.saturating_add(self.space_advance as u32);
                    }
                }
                let units = self.units_per_em.max(1) as f32;
                return advance as f32 * (font_size / units);
            }
        }
        estimate_text_width_units(text) * font_size
    }

    /// Vertical advance between baselines at the given size.
    pub fn line_height(&self, font_size: f32) -> f32 {
        let units = self.units_per_em.max(1) as f32;
        let height = (self.ascent as i32 - self.descent as i32 + self.line_gap as i32) as f32;
        if height <= 0.0 {
            return font_size * 1.1;
        }
        height * (font_size / units)
    }
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

fn load_font_metrics_from_data(data: Vec<u8>) -> Result<FontMetrics> {
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    for index in 0..count {
        if let Ok(face) = Face::parse(&data, index) {
            let family = extract_family_name(&face);
            let units_per_em = face.units_per_em().max(1);
            let space_advance = face
                .glyph_index(' ')
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(units_per_em / 2);
            let ascent = face.ascender();
            let descent = face.descender();
            let line_gap = face.line_gap();
            return Ok(FontMetrics {
                data: Some(Arc::new(data)),
                face_index: index,
                units_per_em,
                space_advance,
                ascent,
                descent,
                line_gap,
                family,
            });
        }
    }
    Err(anyhow!("failed to parse font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

fn estimate_char_units_for_width(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xAC00..=0xD7AF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units_for_width).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_metrics_scale_with_size() {
        let metrics = FontMetrics::estimated();
        let narrow = metrics.measure_width("hello", 10.0);
        let wide = metrics.measure_width("hello", 20.0);
        assert!(narrow > 0.0);
        assert!((wide - narrow * 2.0).abs() < 0.001);
    }

    #[test]
    fn estimated_line_height_is_proportional() {
        let metrics = FontMetrics::estimated();
        assert!((metrics.line_height(20.0) - 22.0).abs() < 0.001);
    }

    #[test]
    fn cjk_measures_wider_than_ascii() {
        let metrics = FontMetrics::estimated();
        let hangul = metrics.measure_width("안녕", 24.0);
        let latin = metrics.measure_width("ab", 24.0);
        assert!(hangul > latin);
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let err = load_font_metrics(Path::new("/nonexistent/font.ttf"));
        assert!(err.is_err());
    }

    #[test]
    fn garbage_data_is_an_error() {
        let err = load_font_metrics_from_data(vec![0u8; 16]);
        assert!(err.is_err());
    }
}
