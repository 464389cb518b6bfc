//! Backlight color helpers.
//!
//! Named colors for the letter codes used by the text command protocol
//! (r/g/b/y/w), plus an HSV convenience converter for callers that want
//! arbitrary hues.
//!
//! All items use `palette::Srgb` for direct use with [`crate::device::ColorHandle`].

use palette::{FromColor, Hsv, Srgb};

/// Full red.
pub const RED: Srgb = Srgb::new(1.0, 0.0, 0.0);
/// Full green.
pub const GREEN: Srgb = Srgb::new(0.0, 1.0, 0.0);
/// Full blue.
pub const BLUE: Srgb = Srgb::new(0.0, 0.0, 1.0);
/// Full yellow.
pub const YELLOW: Srgb = Srgb::new(1.0, 1.0, 0.0);
/// Full white.
pub const WHITE: Srgb = Srgb::new(1.0, 1.0, 1.0);

/// Resolves a protocol color letter code to its color.
///
/// Recognized codes: `r`, `g`, `b`, `y`, `w`.
pub fn from_code(code: char) -> Option<Srgb> {
    match code {
        'r' => Some(RED),
        'g' => Some(GREEN),
        'b' => Some(BLUE),
        'y' => Some(YELLOW),
        'w' => Some(WHITE),
        _ => None,
    }
}

/// Creates an RGB color from HSV (Hue, Saturation, Value) components.
#[inline]
pub fn hsv(hue: f32, saturation: f32, value: f32) -> Srgb {
    let hsv = Hsv::new(hue, saturation, value);
    Srgb::from_color(hsv)
}
