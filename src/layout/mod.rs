mod contrast;
mod fit;
mod font;
mod place;
mod wrap;

pub use contrast::{ColorPair, mean_luminance, select_colors, select_colors_for};
pub use fit::{FittedBlock, fit_text};
pub use font::{FontMetrics, load_font_metrics};
pub use place::{PLACEMENT_MARGIN, PlacementHint, resolve_origin};
pub use wrap::wrap_text;

/// An ordered block of caption lines with its measured bounding box for one
/// (font, size) pairing. Line N renders above line N+1. Blocks are recomputed
/// whenever the size changes; measurements are never reused across sizes.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

impl TextBlock {
    pub fn measure(lines: Vec<String>, font: &FontMetrics, font_size: f32) -> Self {
        let width = lines
            .iter()
            .map(|line| font.measure_width(line, font_size))
            .fold(0.0, f32::max);
        let height = lines.len() as f32 * font.line_height(font_size);
        Self {
            lines,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
