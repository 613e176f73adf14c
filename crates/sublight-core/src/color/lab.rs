//! CIE L*a*b* conversions (D65 illuminant, sRGB primaries).

use crate::image::Image;

/// LAB color representation (CIE L*a*b*)
/// - L: 0.0-100.0 (lightness)
/// - a: approximately -128 to +128 (green-red axis)
/// - b: approximately -128 to +128 (blue-yellow axis)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

/// D65 standard illuminant reference white point.
const D65_X: f32 = 0.95047;
const D65_Y: f32 = 1.00000;
const D65_Z: f32 = 1.08883;

/// sRGB to XYZ matrix (D65).
const SRGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.119_192, 0.9503041],
];

/// XYZ to sRGB matrix (D65).
const XYZ_TO_SRGB: [[f32; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.969_266, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// LAB f(t) function.
#[inline]
fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    const DELTA_CUBED: f32 = DELTA * DELTA * DELTA;

    if t > DELTA_CUBED {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// LAB f^-1(t) inverse function.
#[inline]
fn lab_f_inv(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;

    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// Convert RGB in `[0, 1]` to CIE LAB.
///
/// Output: L is 0-100, a and b are approximately -128 to +128.
#[inline]
pub fn rgb_to_lab(r: f32, g: f32, b: f32) -> Lab {
    let r = r.max(0.0);
    let g = g.max(0.0);
    let b = b.max(0.0);

    let m = &SRGB_TO_XYZ;
    let x = m[0][0] * r + m[0][1] * g + m[0][2] * b;
    let y = m[1][0] * r + m[1][1] * g + m[1][2] * b;
    let z = m[2][0] * r + m[2][1] * g + m[2][2] * b;

    let fx = lab_f(x / D65_X);
    let fy = lab_f(y / D65_Y);
    let fz = lab_f(z / D65_Z);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert CIE LAB back to RGB.
///
/// Output may fall outside `[0, 1]` for out-of-gamut colors; callers clamp.
#[inline]
pub fn lab_to_rgb(lab: Lab) -> (f32, f32, f32) {
    let Lab { l, a, b } = lab;

    let fy = (l + 16.0) / 116.0;
    let fx = a / 500.0 + fy;
    let fz = fy - b / 200.0;

    let x = D65_X * lab_f_inv(fx);
    let y = D65_Y * lab_f_inv(fy);
    let z = D65_Z * lab_f_inv(fz);

    let m = &XYZ_TO_SRGB;
    (
        m[0][0] * x + m[0][1] * y + m[0][2] * z,
        m[1][0] * x + m[1][1] * y + m[1][2] * z,
        m[2][0] * x + m[2][1] * y + m[2][2] * z,
    )
}

/// Extract the L* plane normalized to `[0, 1]` (L / 100).
pub fn lightness_plane(image: &Image) -> Vec<f32> {
    image
        .data()
        .chunks_exact(3)
        .map(|px| rgb_to_lab(px[0], px[1], px[2]).l / 100.0)
        .collect()
}

/// Rebuild an image from a modified normalized L* plane, keeping each
/// pixel's original a* and b*. Output is clamped to `[0, 1]`.
pub fn set_lightness_plane(image: &Image, lightness: &[f32]) -> Image {
    debug_assert_eq!(lightness.len(), image.num_pixels());
    let mut data = Vec::with_capacity(image.data().len());
    for (px, &l) in image.data().chunks_exact(3).zip(lightness.iter()) {
        let lab = rgb_to_lab(px[0], px[1], px[2]);
        let (r, g, b) = lab_to_rgb(Lab {
            l: (l * 100.0).clamp(0.0, 100.0),
            a: lab.a,
            b: lab.b,
        });
        data.push(r.clamp(0.0, 1.0));
        data.push(g.clamp(0.0, 1.0));
        data.push(b.clamp(0.0, 1.0));
    }
    Image::from_raw(image.width(), image.height(), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_lightness() {
        let lab = rgb_to_lab(1.0, 1.0, 1.0);
        assert!((lab.l - 100.0).abs() < 0.1, "L was {}", lab.l);
        assert!(lab.a.abs() < 0.5);
        assert!(lab.b.abs() < 0.5);
    }

    #[test]
    fn test_black_lightness() {
        let lab = rgb_to_lab(0.0, 0.0, 0.0);
        assert!(lab.l.abs() < 1e-3);
    }

    #[test]
    fn test_round_trip() {
        for &(r, g, b) in &[
            (0.5, 0.5, 0.5),
            (0.8, 0.2, 0.1),
            (0.1, 0.6, 0.9),
            (0.25, 0.75, 0.3),
        ] {
            let (r2, g2, b2) = lab_to_rgb(rgb_to_lab(r, g, b));
            assert!((r - r2).abs() < 1e-3, "r: {} vs {}", r, r2);
            assert!((g - g2).abs() < 1e-3, "g: {} vs {}", g, g2);
            assert!((b - b2).abs() < 1e-3, "b: {} vs {}", b, b2);
        }
    }

    #[test]
    fn test_green_is_negative_a() {
        let lab = rgb_to_lab(0.0, 1.0, 0.0);
        assert!(lab.a < -50.0, "a was {}", lab.a);
    }

    #[test]
    fn test_lightness_plane_round_trip() {
        let img = Image::constant(4, 4, [0.3, 0.5, 0.7]);
        let plane = lightness_plane(&img);
        let rebuilt = set_lightness_plane(&img, &plane);
        assert!(img.mean_abs_diff(&rebuilt) < 2e-3);
    }
}
