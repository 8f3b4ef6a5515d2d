use image::RgbaImage;

/// Fill/outline colors burned into the composited image. Values are CSS color
/// keywords or hex strings, passed through to the SVG renderer untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPair {
    pub fill: String,
    pub outline: String,
}

impl ColorPair {
    pub fn new(fill: impl Into<String>, outline: impl Into<String>) -> Self {
        Self {
            fill: fill.into(),
            outline: outline.into(),
        }
    }
}

/// Arithmetic mean of the R/G/B channels weighted into a perceptual luminance.
/// Alpha is ignored; an empty image reads as black.
pub fn mean_luminance(image: &RgbaImage) -> f32 {
    let pixel_count = (image.width() as u64) * (image.height() as u64);
    if pixel_count == 0 {
        return 0.0;
    }
    let mut sum_r = 0u64;
    let mut sum_g = 0u64;
    let mut sum_b = 0u64;
    for pixel in image.pixels() {
        sum_r += pixel.0[0] as u64;
        sum_g += pixel.0[1] as u64;
        sum_b += pixel.0[2] as u64;
    }
    let r = sum_r as f32 / pixel_count as f32;
    let g = sum_g as f32 / pixel_count as f32;
    let b = sum_b as f32 / pixel_count as f32;
    r * 0.299 + g * 0.587 + b * 0.114
}

/// Two-bucket threshold: a bright background gets black text with a white
/// outline, a dark background the reverse. Exactly 128 counts as dark.
/// Busy high-variance images can still defeat this; there is no per-region
/// analysis.
pub fn select_colors(luminance: f32) -> ColorPair {
    if luminance > 128.0 {
        ColorPair::new("black", "white")
    } else {
        ColorPair::new("white", "black")
    }
}

pub fn select_colors_for(image: &RgbaImage) -> ColorPair {
    select_colors(mean_luminance(image))
}
