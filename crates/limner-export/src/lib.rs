//! Rasterizes the rendered diagram SVG for the PNG/JPEG export buttons.
//!
//! Mermaid's SVG output sizes itself via `viewBox` (its width/height
//! attributes are often percentages), so pixel dimensions come from the
//! viewBox when one is present.

#![forbid(unsafe_code)]

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster export")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("failed to encode JPEG")]
    JpegEncode,
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Pixel scale relative to the SVG's CSS size.
    pub scale: f32,
    pub jpeg_quality: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            jpeg_quality: 90,
        }
    }
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let pixmap = render_pixmap(svg, options.scale, None)?;
    pixmap.encode_png().map_err(|_| ExportError::PngEncode)
}

pub fn svg_to_jpeg(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    // JPEG has no alpha channel, so render over an opaque white background.
    let white = tiny_skia::Color::from_rgba8(255, 255, 255, 255);
    let pixmap = render_pixmap(svg, options.scale, Some(white))?;
    let (w, h) = (pixmap.width(), pixmap.height());

    // The background fill makes every pixel opaque, so alpha can be dropped.
    let rgba = pixmap.data();
    let mut rgb = vec![0u8; (w as usize) * (h as usize) * 3];
    for (src, dst) in rgba.chunks_exact(4).zip(rgb.chunks_exact_mut(3)) {
        dst[0] = src[0];
        dst[1] = src[1];
        dst[2] = src[2];
    }

    let mut out = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, options.jpeg_quality);
    encoder
        .encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
        .map_err(|_| ExportError::JpegEncode)?;
    Ok(out)
}

/// Cheap, non-validating parse of the root `viewBox="minX minY w h"`.
fn parse_viewbox_size(svg: &str) -> Option<(f32, f32)> {
    let i = svg.find("viewBox=\"")?;
    let rest = &svg[i + "viewBox=\"".len()..];
    let raw = &rest[..rest.find('"')?];
    let mut it = raw.split_whitespace();
    let _min_x = it.next()?.parse::<f32>().ok()?;
    let _min_y = it.next()?.parse::<f32>().ok()?;
    let width = it.next()?.parse::<f32>().ok()?;
    let height = it.next()?.parse::<f32>().ok()?;
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Some((width, height))
    } else {
        None
    }
}

fn render_pixmap(
    svg: &str,
    scale: f32,
    background: Option<tiny_skia::Color>,
) -> Result<tiny_skia::Pixmap> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| ExportError::SvgParse)?;

    let (width, height) = match parse_viewbox_size(svg) {
        Some(size) => size,
        None => {
            let size = tree.size();
            (size.width(), size.height())
        }
    };

    let width_px = (width * scale).ceil().max(1.0) as u32;
    let height_px = (height * scale).ceil().max(1.0) as u32;

    let mut pixmap =
        tiny_skia::Pixmap::new(width_px, height_px).ok_or(ExportError::PixmapAlloc)?;

    if let Some(color) = background {
        pixmap.fill(color);
    }

    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}
