//! Renderer - opens, stamps and saves one image
//!
//! The input file is only ever opened for reading. Output format follows the
//! output extension; JPEG outputs and inputs without alpha are written as RGB.

use ab_glyph::{point, Font, FontVec, GlyphId, InvalidFont, OutlinedGlyph, PxScale, Rect, ScaleFont};
use image::{DynamicImage, ImageError, ImageFormat, Rgba, RgbaImage};
use imageproc::pixelops::weighted_sum;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::color::HexColor;
use crate::placement::{default_margin, outline_offsets, text_origin, Anchor};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Input image not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("Could not read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not parse font {path}: {source}")]
    FontParse {
        path: PathBuf,
        #[source]
        source: InvalidFont,
    },

    #[error("Output path is the input image: {0}")]
    OverwritesInput(PathBuf),

    #[error("Could not create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// Text and styling drawn onto an image.
#[derive(Debug, Clone)]
pub struct Caption {
    pub text: String,
    pub font_size: u32,
    pub color: HexColor,
    pub outline_color: HexColor,
    pub outline_width: u32,
    pub anchor: Anchor,
    /// `None` means a tenth of the image height.
    pub margin: Option<u32>,
}

/// A fully resolved render job: absolute paths and concrete styling.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub font_path: PathBuf,
    pub caption: Caption,
    /// Gaussian blur sigma applied before drawing.
    pub blur: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub output: PathBuf,
    pub image_size: (u32, u32),
    pub text_size: (u32, u32),
    pub origin: (i32, i32),
}

/// Where a caption would be drawn, without drawing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub text_size: (u32, u32),
    pub origin: (i32, i32),
}

pub fn render(request: &RenderRequest) -> Result<RenderOutput, RenderError> {
    if !request.input.is_file() {
        return Err(RenderError::InputNotFound(request.input.clone()));
    }
    ensure_distinct(&request.input, &request.output)?;

    let mut image = image::open(&request.input).map_err(|source| RenderError::Decode {
        path: request.input.clone(),
        source,
    })?;
    let has_alpha = image.color().has_alpha();

    let font = load_font(&request.font_path)?;

    if let Some(sigma) = request.blur.filter(|s| *s > 0.0) {
        image = image.blur(sigma);
    }

    let mut canvas = image.to_rgba8();
    tracing::debug!(
        width = canvas.width(),
        height = canvas.height(),
        blurred = request.blur.is_some(),
        "decoded input image"
    );
    let placement = draw_caption(&mut canvas, &font, &request.caption);
    tracing::debug!(x = placement.origin.0, y = placement.origin.1, "caption placed");

    let image_size = canvas.dimensions();
    save(canvas, has_alpha, &request.output)?;

    Ok(RenderOutput {
        output: request.output.clone(),
        image_size,
        text_size: placement.text_size,
        origin: placement.origin,
    })
}

pub fn load_font(path: &Path) -> Result<FontVec, RenderError> {
    let data = fs::read(path).map_err(|source| RenderError::FontRead {
        path: path.to_path_buf(),
        source,
    })?;
    FontVec::try_from_vec(data).map_err(|source| RenderError::FontParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Glyphs of a single-line caption and the union of their pixel bounds.
///
/// The union is the inked area, so a caption's box covers ascenders and
/// descenders alike ("Hg" is taller than "H").
pub struct CaptionLayout {
    glyphs: Vec<OutlinedGlyph>,
    bounds: Option<Rect>,
}

impl CaptionLayout {
    pub fn new(font: &impl Font, caption: &Caption) -> Self {
        let scale = PxScale::from(caption.font_size as f32);
        let scaled = font.as_scaled(scale);

        let mut glyphs = vec![];
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;
        for c in caption.text.chars().filter(|c| !c.is_control()) {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
            caret += scaled.h_advance(id);
            previous = Some(id);

            // whitespace has no outline
            if let Some(outlined) = font.outline_glyph(glyph) {
                glyphs.push(outlined);
            }
        }

        let bounds = glyphs.iter().map(|g| g.px_bounds()).reduce(|a, b| Rect {
            min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
            max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
        });

        Self { glyphs, bounds }
    }

    /// Width and height of the inked area, zero for blank text.
    pub fn size(&self) -> (u32, u32) {
        match self.bounds {
            Some(b) => ((b.max.x - b.min.x) as u32, (b.max.y - b.min.y) as u32),
            None => (0, 0),
        }
    }

    /// Blend every glyph so the top-left of the inked area lands on `origin`.
    pub fn draw(&self, canvas: &mut RgbaImage, origin: (i32, i32), color: Rgba<u8>) {
        let Some(bounds) = self.bounds else {
            return;
        };
        let shift_x = origin.0.saturating_sub(bounds.min.x as i32);
        let shift_y = origin.1.saturating_sub(bounds.min.y as i32);
        let (width, height) = (canvas.width() as i64, canvas.height() as i64);

        for glyph in &self.glyphs {
            let gb = glyph.px_bounds();
            let left = gb.min.x as i64 + shift_x as i64;
            let top = gb.min.y as i64 + shift_y as i64;
            glyph.draw(|gx, gy, coverage| {
                let (px, py) = (left + gx as i64, top + gy as i64);
                if px < 0 || py < 0 || px >= width || py >= height {
                    return;
                }
                let coverage = coverage.clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    return;
                }
                let pixel = canvas.get_pixel_mut(px as u32, py as u32);
                *pixel = weighted_sum(*pixel, color, 1.0 - coverage, coverage);
            });
        }
    }
}

/// Measure the caption and compute its top-left corner on `image_size`.
pub fn place_caption(image_size: (u32, u32), font: &impl Font, caption: &Caption) -> Placement {
    place_layout(image_size, &CaptionLayout::new(font, caption), caption)
}

fn place_layout(image_size: (u32, u32), layout: &CaptionLayout, caption: &Caption) -> Placement {
    let size = layout.size();
    let margin = caption
        .margin
        .map(|m| i32::try_from(m).unwrap_or(i32::MAX))
        .unwrap_or_else(|| default_margin(image_size.1));
    Placement {
        text_size: size,
        origin: text_origin(image_size, size, caption.anchor, margin),
    }
}

/// Draw the outline copies then the fill on top.
pub fn draw_caption(canvas: &mut RgbaImage, font: &impl Font, caption: &Caption) -> Placement {
    let layout = CaptionLayout::new(font, caption);
    let placement = place_layout(canvas.dimensions(), &layout, caption);
    let (x, y) = placement.origin;

    let outline = caption.outline_color.to_rgba();
    for (dx, dy) in outline_offsets(caption.outline_width) {
        layout.draw(canvas, (x.saturating_add(dx), y.saturating_add(dy)), outline);
    }
    layout.draw(canvas, placement.origin, caption.color.to_rgba());

    placement
}

fn ensure_distinct(input: &Path, output: &Path) -> Result<(), RenderError> {
    if !output.exists() {
        return Ok(());
    }
    match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) if a == b => Err(RenderError::OverwritesInput(output.to_path_buf())),
        _ => Ok(()),
    }
}

fn save(canvas: RgbaImage, keep_alpha: bool, path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RenderError::OutputDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let is_jpeg = matches!(ImageFormat::from_path(path), Ok(ImageFormat::Jpeg));
    let image = DynamicImage::ImageRgba8(canvas);
    let image = if keep_alpha && !is_jpeg {
        image
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    image.save(path).map_err(|source| RenderError::Save {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    const FONT_CANDIDATES: &[&str] = &[
        crate::DEFAULT_FONT_PATH,
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    fn system_font() -> Option<PathBuf> {
        FONT_CANDIDATES.iter().map(PathBuf::from).find(|p| p.is_file())
    }

    fn caption(text: &str) -> Caption {
        Caption {
            text: text.to_string(),
            font_size: 24,
            color: HexColor::WHITE,
            outline_color: HexColor::BLACK,
            outline_width: 2,
            anchor: Anchor::Bottom,
            margin: None,
        }
    }

    fn request(dir: &TempDir, font_path: PathBuf) -> RenderRequest {
        RenderRequest {
            input: dir.path().join("in.png"),
            output: dir.path().join("out/nested/out.png"),
            font_path,
            caption: caption("Hello"),
            blur: None,
        }
    }

    fn write_input(dir: &TempDir) {
        RgbImage::from_pixel(120, 80, Rgb([40, 90, 160]))
            .save(dir.path().join("in.png"))
            .unwrap();
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = render(&request(&dir, PathBuf::from("/no/font.ttf"))).unwrap_err();
        assert!(matches!(err, RenderError::InputNotFound(_)));
    }

    #[test]
    fn test_unreadable_font() {
        let dir = TempDir::new().unwrap();
        write_input(&dir);
        let err = render(&request(&dir, dir.path().join("missing.ttf"))).unwrap_err();
        assert!(matches!(err, RenderError::FontRead { .. }));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_garbage_font() {
        let dir = TempDir::new().unwrap();
        write_input(&dir);
        let font = dir.path().join("bad.ttf");
        fs::write(&font, b"not a font").unwrap();
        let err = render(&request(&dir, font)).unwrap_err();
        assert!(matches!(err, RenderError::FontParse { .. }));
    }

    #[test]
    fn test_undecodable_input() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.png"), b"plain text").unwrap();
        let err = render(&request(&dir, PathBuf::from("/no/font.ttf"))).unwrap_err();
        assert!(matches!(err, RenderError::Decode { .. }));
    }

    #[test]
    fn test_refuses_to_overwrite_input() {
        let dir = TempDir::new().unwrap();
        write_input(&dir);
        let mut req = request(&dir, PathBuf::from("/no/font.ttf"));
        req.output = dir.path().join("./in.png");
        let err = render(&req).unwrap_err();
        assert!(matches!(err, RenderError::OverwritesInput(_)));
    }

    #[test]
    fn test_save_jpeg_drops_alpha() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/out.jpg");
        save(RgbaImage::new(8, 8), true, &path).unwrap();
        assert!(path.is_file());
        assert_eq!(ImageFormat::from_path(&path).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_render_with_system_font() {
        let Some(font) = system_font() else {
            eprintln!("no system font found, skipping");
            return;
        };
        let dir = TempDir::new().unwrap();
        write_input(&dir);
        let req = request(&dir, font);

        let out = render(&req).unwrap();
        assert_eq!(out.image_size, (120, 80));
        assert!(out.text_size.0 > 0 && out.text_size.1 > 0);
        assert_eq!(out.origin.0, (120 - out.text_size.0 as i32).div_euclid(2));
        assert_eq!(out.origin.1, 80 - out.text_size.1 as i32 - 8);

        let written = image::open(&req.output).unwrap().to_rgb8();
        let original = image::open(&req.input).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), original.dimensions());
        assert_ne!(written.as_raw(), original.as_raw());
    }

    /// Bounding box of every pixel with a non-zero red channel.
    fn inked_box(canvas: &RgbaImage) -> Option<(i32, i32, i32, i32)> {
        let inked: Vec<_> = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] > 0)
            .map(|(x, y, _)| (x as i32, y as i32))
            .collect();
        let min_x = inked.iter().map(|p| p.0).min()?;
        let min_y = inked.iter().map(|p| p.1).min()?;
        let max_x = inked.iter().map(|p| p.0).max()?;
        let max_y = inked.iter().map(|p| p.1).max()?;
        Some((min_x, min_y, max_x, max_y))
    }

    fn fill_only(text: &str, anchor: Anchor, margin: u32) -> Caption {
        let mut c = caption(text);
        c.font_size = 48;
        c.outline_width = 0;
        c.anchor = anchor;
        c.margin = Some(margin);
        c
    }

    #[test]
    fn test_drawn_text_respects_bottom_margin() {
        let Some(path) = system_font() else {
            eprintln!("no system font found, skipping");
            return;
        };
        let font = load_font(&path).unwrap();

        for text in ["HELLO", "Hg", "gypq"] {
            let mut canvas = RgbaImage::from_pixel(400, 200, image::Rgba([0, 0, 0, 255]));
            let placement = draw_caption(&mut canvas, &font, &fill_only(text, Anchor::Bottom, 20));
            let (x, y) = placement.origin;
            let (w, h) = placement.text_size;
            let (min_x, min_y, max_x, max_y) = inked_box(&canvas).unwrap();

            assert_eq!(y + h as i32, 180, "{text}");
            // pixel bounds are conservative: edge rows may carry no visible ink
            assert!((178..=179).contains(&max_y), "{text}: bottom ink at {max_y}");
            assert!((y..=y + 1).contains(&min_y), "{text}: top ink at {min_y}, origin {y}");
            assert!(min_x >= x && max_x < x + w as i32, "{text}: ink {min_x}..{max_x}, box {x}+{w}");
        }
    }

    #[test]
    fn test_drawn_text_starts_at_top_margin() {
        let Some(path) = system_font() else {
            return;
        };
        let font = load_font(&path).unwrap();
        let mut canvas = RgbaImage::from_pixel(400, 200, image::Rgba([0, 0, 0, 255]));
        let placement = draw_caption(&mut canvas, &font, &fill_only("gypq", Anchor::Top, 15));
        assert_eq!(placement.origin.1, 15);

        let (_, min_y, _, max_y) = inked_box(&canvas).unwrap();
        assert!((15..=16).contains(&min_y));
        assert!(max_y < 15 + placement.text_size.1 as i32);
    }

    #[test]
    fn test_descenders_extend_text_box() {
        let Some(path) = system_font() else {
            return;
        };
        let font = load_font(&path).unwrap();
        let tall = CaptionLayout::new(&font, &caption("H")).size();
        let mixed = CaptionLayout::new(&font, &caption("Hg")).size();
        assert!(mixed.1 > tall.1);
        assert!(mixed.0 > tall.0);
    }

    #[test]
    fn test_outline_width_zero_draws_fill_only() {
        let Some(path) = system_font() else {
            return;
        };
        let font = load_font(&path).unwrap();
        let mut canvas = RgbaImage::from_pixel(200, 100, image::Rgba([0, 0, 0, 255]));
        let mut c = caption("Hi");
        c.outline_width = 0;
        c.outline_color = HexColor { r: 255, g: 0, b: 0 };
        draw_caption(&mut canvas, &font, &c);
        assert!(canvas.pixels().all(|p| p.0[0] == p.0[1]));
    }
}
