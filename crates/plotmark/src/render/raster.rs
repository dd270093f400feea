#![forbid(unsafe_code)]

//! PNG output for the marker overlay.

use plotmark_render::SvgMarkerLayer;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse overlay SVG")]
    SvgParse,
    #[error("failed to allocate a {width}x{height} pixmap for the overlay")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid background color: {0}")]
    Background(String),
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
    /// `None` keeps the overlay transparent so it can be composited over a chart screenshot.
    pub background: Option<String>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: None,
        }
    }
}

pub fn overlay_to_png(layer: &SvgMarkerLayer, options: &RasterOptions) -> Result<Vec<u8>> {
    svg_to_png(&layer.to_svg_document(), options)
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())
        .map_err(|_| RasterError::SvgParse)?;

    let size = tree.size();
    let width = (size.width() * options.scale).ceil().max(1.0) as u32;
    let height = (size.height() * options.scale).ceil().max(1.0) as u32;
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RasterError::PixmapAlloc { width, height })?;

    if let Some(bg) = options.background.as_deref() {
        let color = parse_color(bg).ok_or_else(|| RasterError::Background(bg.to_string()))?;
        pixmap.fill(color);
    }

    let transform = tiny_skia::Transform::from_scale(options.scale, options.scale);
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    pixmap.encode_png().map_err(|_| RasterError::PngEncode)
}

fn parse_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 255)),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(tiny_skia::Color::from_rgba8(
        channel(0)?,
        channel(2)?,
        channel(4)?,
        255,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotmark_core::geom::{pixel_point, pixel_size};
    use plotmark_render::{MarkerStyle, MarkerSurface};

    #[test]
    fn overlay_png_has_png_signature_and_layer_size() {
        let layer = SvgMarkerLayer::new(pixel_size(40.0, 20.0));
        let style = MarkerStyle {
            class_name: "m".to_string(),
            radius: 4.0,
            fill: "rgba(255, 165, 0, 0.8)".to_string(),
            stroke: "black".to_string(),
            stroke_width: 2.0,
        };
        layer
            .append_marker(&style.marker_at(pixel_point(10.0, 10.0), 0, 0))
            .unwrap();
        let bytes = overlay_to_png(&layer, &RasterOptions::default()).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
        // IHDR width/height, big-endian, right after the 8-byte signature + 8-byte chunk header.
        assert_eq!(&bytes[16..20], &40u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &20u32.to_be_bytes());
    }

    #[test]
    fn background_colors() {
        assert!(parse_color("#ffA500").is_some());
        assert!(parse_color("white").is_some());
        assert!(parse_color("#fff").is_none());
        let err = svg_to_png(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="2" height="2"/>"#,
            &RasterOptions {
                scale: 1.0,
                background: Some("orange-ish".to_string()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, RasterError::Background(_)));
    }
}
