//! Color space conversions.
//!
//! RGB <-> HSV for the saturation guards and quality checks, RGB <-> LAB for
//! CLAHE and luminance preservation.

mod hsv;
mod lab;

pub use hsv::{hsv_to_rgb, rgb_to_hsv, Hsv};
pub use lab::{lab_to_rgb, lightness_plane, rgb_to_lab, set_lightness_plane, Lab};
