use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use resvg::render;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::layout::{ColorPair, FontMetrics, TextBlock};

/// One caption overlay: a measured block, the font it was measured with, the
/// resolved top-left origin and the color pair.
pub struct Overlay<'a> {
    pub block: &'a TextBlock,
    pub font: &'a FontMetrics,
    pub font_size: f32,
    pub origin: (f32, f32),
    pub colors: &'a ColorPair,
}

/// Burns the caption into the image. The base raster becomes an SVG `<image>`
/// data URI; the text block is drawn four times at one-pixel offsets in the
/// outline color and once more on top in the fill color, then the whole tree
/// is rasterized back to pixels. Output is a pure function of the inputs.
pub fn composite(
    image_bytes: &[u8],
    image_mime: &str,
    width: u32,
    height: u32,
    overlay: &Overlay<'_>,
) -> Result<image::RgbaImage> {
    let svg = build_svg(image_bytes, image_mime, width, height, overlay);
    rasterize(&svg, overlay.font.data())
}

const OUTLINE_OFFSETS: [(f32, f32); 4] = [(-1.0, 0.0), (1.0, 0.0), (0.0, -1.0), (0.0, 1.0)];

fn build_svg(
    image_bytes: &[u8],
    image_mime: &str,
    width: u32,
    height: u32,
    overlay: &Overlay<'_>,
) -> String {
    let encoded = BASE64.encode(image_bytes);
    let data_uri = format!("data:{};base64,{}", image_mime, encoded);

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    if !overlay.block.is_empty() {
        let (x, y) = overlay.origin;
        for (dx, dy) in OUTLINE_OFFSETS {
            push_text_pass(&mut svg, overlay, x + dx, y + dy, &overlay.colors.outline);
        }
        push_text_pass(&mut svg, overlay, x, y, &overlay.colors.fill);
    }

    svg.push_str("</svg>");
    svg
}

fn push_text_pass(svg: &mut String, overlay: &Overlay<'_>, x: f32, y: f32, color: &str) {
    let line_height = overlay.font.line_height(overlay.font_size);
    // SVG positions text by baseline; the first baseline sits one font size
    // below the block's top edge.
    let baseline = y + overlay.font_size;
    if let Some(family) = overlay.font.family() {
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}" font-family="{family}">"#,
            x = x,
            y = baseline,
            size = overlay.font_size,
            color = color,
            family = escape_xml(family)
        ));
    } else {
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}">"#,
            x = x,
            y = baseline,
            size = overlay.font_size,
            color = color
        ));
    }
    for (idx, line) in overlay.block.lines.iter().enumerate() {
        let escaped = escape_xml(line);
        if idx == 0 {
            svg.push_str(&escaped);
        } else {
            svg.push_str(&format!(
                r#"<tspan x="{x}" dy="{dy}">{text}</tspan>"#,
                x = x,
                dy = line_height,
                text = escaped
            ));
        }
    }
    svg.push_str("</text>");
}

fn rasterize(svg: &str, font_data: Option<&[u8]>) -> Result<image::RgbaImage> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(data) = font_data {
        db.load_font_data(data.to_vec());
    }
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse composite SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty composite size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from composite"))
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
