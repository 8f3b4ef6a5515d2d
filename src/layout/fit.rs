use super::TextBlock;
use super::font::FontMetrics;
use super::wrap::wrap_text;

/// Outcome of the size search. `fits` is false when even the floor size could
/// not satisfy the box; the caller is expected to accept the oversized render
/// rather than abort.
#[derive(Debug, Clone)]
pub struct FittedBlock {
    pub font_size: f32,
    pub block: TextBlock,
    pub fits: bool,
}

/// Caps the starting size. Above 2^24 an f32 can no longer represent `x - 1.0`
/// distinctly from `x`, so an uncapped request-supplied size would stall the
/// descent; anything past this ceiling renders identically oversized anyway.
pub const MAX_START_SIZE: f32 = 1000.0;

/// Descending size search: wrap and measure at the starting size, decrement by
/// one point while the block overflows (maxWidth, maxHeight). The start is
/// capped at [`MAX_START_SIZE`] and the floor bounds the descent, so the loop
/// runs at most `cap - floor + 1` times and the returned size is never above
/// the capped start nor below the floor. A start below the floor is clamped up
/// to the floor, which then wins over the start.
pub fn fit_text(
    text: &str,
    font: &FontMetrics,
    start_size: f32,
    min_size: f32,
    max_width: f32,
    max_height: f32,
) -> FittedBlock {
    let min_size = min_size.max(1.0).min(MAX_START_SIZE);
    // A NaN start would slip through clamp and stall every comparison below.
    let mut font_size = if start_size.is_finite() {
        start_size.clamp(min_size, MAX_START_SIZE)
    } else {
        min_size
    };

    loop {
        let lines = wrap_text(text, font, font_size, max_width);
        let block = TextBlock::measure(lines, font, font_size);
        if block.width <= max_width && block.height <= max_height {
            return FittedBlock {
                font_size,
                block,
                fits: true,
            };
        }
        if font_size <= min_size {
            return FittedBlock {
                font_size,
                block,
                fits: false,
            };
        }
        font_size = (font_size - 1.0).max(min_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> FontMetrics {
        FontMetrics::estimated()
    }

    #[test]
    fn fit_never_exceeds_the_starting_size() {
        let fitted = fit_text("a modest caption", &font(), 24.0, 10.0, 10_000.0, 10_000.0);
        assert!(fitted.font_size <= 24.0);
        assert!(fitted.fits);
        assert_eq!(fitted.font_size, 24.0);
    }

    #[test]
    fn fit_never_goes_below_the_floor() {
        let fitted = fit_text(
            "a caption that cannot possibly fit anywhere",
            &font(),
            24.0,
            10.0,
            5.0,
            5.0,
        );
        assert_eq!(fitted.font_size, 10.0);
        assert!(!fitted.fits);
        assert!(!fitted.block.lines.is_empty());
    }

    #[test]
    fn shrinks_until_the_box_is_satisfied() {
        let font = font();
        let text = "several words that need a smaller size";
        let fitted = fit_text(text, &font, 30.0, 4.0, 120.0, 80.0);
        assert!(fitted.fits);
        assert!(fitted.block.width <= 120.0);
        assert!(fitted.block.height <= 80.0);
        if fitted.font_size < 30.0 {
            let larger_lines = wrap_text(text, &font, fitted.font_size + 1.0, 120.0);
            let larger = TextBlock::measure(larger_lines, &font, fitted.font_size + 1.0);
            assert!(larger.width > 120.0 || larger.height > 80.0);
        }
    }

    #[test]
    fn starting_size_below_floor_is_clamped_up() {
        // Floor wins over the start in this degenerate configuration.
        let fitted = fit_text("x", &font(), 4.0, 10.0, 10_000.0, 10_000.0);
        assert_eq!(fitted.font_size, 10.0);
    }

    #[test]
    fn huge_starting_size_is_capped_and_terminates() {
        // 1e8 exceeds f32's integer precision, so an uncapped descent by 1.0
        // would never change the size.
        let fitted = fit_text("a caption", &font(), 1.0e8, 10.0, 100.0, 100.0);
        assert!(fitted.font_size <= MAX_START_SIZE);
        assert!(fitted.font_size >= 10.0);
        assert!(fitted.fits);
    }

    #[test]
    fn non_finite_starting_size_falls_back_to_the_floor() {
        let fitted = fit_text("x", &font(), f32::NAN, 10.0, 10_000.0, 10_000.0);
        assert_eq!(fitted.font_size, 10.0);
        let fitted = fit_text("x", &font(), f32::INFINITY, 10.0, 10_000.0, 10_000.0);
        assert!(fitted.font_size <= MAX_START_SIZE);
    }

    #[test]
    fn empty_text_fits_immediately() {
        let fitted = fit_text("", &font(), 24.0, 10.0, 1.0, 1.0);
        assert!(fitted.fits);
        assert!(fitted.block.is_empty());
    }
}
