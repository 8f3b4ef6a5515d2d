/// Margin between a corner-placed caption and the image edge, in pixels.
pub const PLACEMENT_MARGIN: f32 = 10.0;

/// Coarse semantic zone for the caption. Free text from the placement
/// collaborator is classified by substring; anything unrecognized falls back
/// to the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementHint {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl PlacementHint {
    pub const ALL: [PlacementHint; 5] = [
        PlacementHint::TopLeft,
        PlacementHint::TopRight,
        PlacementHint::BottomLeft,
        PlacementHint::BottomRight,
        PlacementHint::Center,
    ];

    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let top = lower.contains("top") || lower.contains("upper");
        let bottom = lower.contains("bottom") || lower.contains("lower");
        let left = lower.contains("left");
        let right = lower.contains("right");
        match (top, bottom, left, right) {
            (true, false, true, false) => PlacementHint::TopLeft,
            (true, false, false, true) => PlacementHint::TopRight,
            (false, true, true, false) => PlacementHint::BottomLeft,
            (false, true, false, true) => PlacementHint::BottomRight,
            _ => PlacementHint::Center,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementHint::TopLeft => "top left",
            PlacementHint::TopRight => "top right",
            PlacementHint::BottomLeft => "bottom left",
            PlacementHint::BottomRight => "bottom right",
            PlacementHint::Center => "center",
        }
    }
}

/// Maps a hint plus block size to a top-left pixel origin, clamped so the
/// block stays inside the image. When the block is larger than the image the
/// clamp bound goes negative; the origin pins to 0 and the caption is allowed
/// to overflow.
pub fn resolve_origin(
    image_width: u32,
    image_height: u32,
    hint: PlacementHint,
    block_width: f32,
    block_height: f32,
) -> (f32, f32) {
    let img_w = image_width as f32;
    let img_h = image_height as f32;
    let (x, y) = match hint {
        PlacementHint::TopLeft => (PLACEMENT_MARGIN, PLACEMENT_MARGIN),
        PlacementHint::TopRight => (img_w - block_width - PLACEMENT_MARGIN, PLACEMENT_MARGIN),
        PlacementHint::BottomLeft => (PLACEMENT_MARGIN, img_h - block_height - PLACEMENT_MARGIN),
        PlacementHint::BottomRight => (
            img_w - block_width - PLACEMENT_MARGIN,
            img_h - block_height - PLACEMENT_MARGIN,
        ),
        PlacementHint::Center => ((img_w - block_width) / 2.0, (img_h - block_height) / 2.0),
    };
    let x = x.min((img_w - block_width).max(0.0)).max(0.0);
    let y = y.min((img_h - block_height).max(0.0)).max(0.0);
    (x, y)
}
