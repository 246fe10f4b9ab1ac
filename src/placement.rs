//! Text Placement - anchor geometry
//!
//! Coordinates are the top-left corner of the text bounding box. They may be
//! negative when the text is larger than the image; the overflow is clipped
//! by the renderer, not corrected here.

use serde::{Deserialize, Serialize};

/// Vertical placement rule. Text is always centered horizontally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    #[default]
    Bottom,
    Center,
}

/// Margin used when a job does not set one: a tenth of the image height.
pub fn default_margin(image_height: u32) -> i32 {
    clamp_i32(image_height as i64 / 10)
}

/// Top-left drawing coordinate for a `text` box inside an `image` box.
pub fn text_origin(image: (u32, u32), text: (u32, u32), anchor: Anchor, margin: i32) -> (i32, i32) {
    let (image_w, image_h) = (image.0 as i64, image.1 as i64);
    let (text_w, text_h) = (text.0 as i64, text.1 as i64);
    let margin = margin as i64;

    let x = (image_w - text_w).div_euclid(2);
    let y = match anchor {
        Anchor::Top => margin,
        Anchor::Bottom => image_h - text_h - margin,
        Anchor::Center => (image_h - text_h).div_euclid(2),
    };

    (clamp_i32(x), clamp_i32(y))
}

/// Offsets for the outline pass: every point of the square grid of the given
/// radius except the center, which the fill pass covers.
pub fn outline_offsets(width: u32) -> impl Iterator<Item = (i32, i32)> {
    let w = clamp_i32(width as i64);
    (-w..=w)
        .flat_map(move |dx| (-w..=w).map(move |dy| (dx, dy)))
        .filter(|&offset| offset != (0, 0))
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
