//! Gaussian and Laplacian pyramids for multi-scale fusion.
//!
//! Levels shrink by a configurable ratio rather than a fixed octave. The
//! collapse uses the same upsampling operator as the build, so
//! `collapse(laplacian(I))` reconstructs `I` up to interpolation error.

use crate::image::Image;

use super::filter::{gaussian_blur_image, gaussian_blur_plane};
use super::resize::{resize_image_bilinear, resize_plane_bilinear};

/// Single-channel level of a weight pyramid.
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

fn next_size(size: usize, scale: f32) -> usize {
    ((size as f32 / scale).round() as usize).max(1)
}

/// Gaussian pyramid of a single plane: blur then shrink, `levels` entries.
pub fn gaussian_pyramid_plane(
    plane: &[f32],
    width: usize,
    height: usize,
    levels: usize,
    scale: f32,
    sigma: f32,
) -> Vec<Plane> {
    let mut pyramid = Vec::with_capacity(levels);
    pyramid.push(Plane {
        data: plane.to_vec(),
        width,
        height,
    });
    for _ in 1..levels {
        let prev = pyramid.last().unwrap();
        let blurred = gaussian_blur_plane(&prev.data, prev.width, prev.height, sigma);
        let nw = next_size(prev.width, scale);
        let nh = next_size(prev.height, scale);
        let data = resize_plane_bilinear(&blurred, prev.width, prev.height, nw, nh);
        pyramid.push(Plane {
            data,
            width: nw,
            height: nh,
        });
    }
    pyramid
}

/// Laplacian pyramid of an RGB image. The last level is the Gaussian top;
/// every other level holds the residual against the upsampled next level.
/// Residual samples are signed and lie outside `[0, 1]`.
pub fn laplacian_pyramid_image(
    image: &Image,
    levels: usize,
    scale: f32,
    sigma: f32,
) -> Vec<Image> {
    // Gaussian pyramid of images first.
    let mut gaussian = Vec::with_capacity(levels);
    gaussian.push(image.clone());
    for _ in 1..levels {
        let prev: &Image = gaussian.last().unwrap();
        let blurred = gaussian_blur_image(prev, sigma);
        let nw = next_size(prev.width() as usize, scale) as u32;
        let nh = next_size(prev.height() as usize, scale) as u32;
        gaussian.push(resize_image_bilinear(&blurred, nw, nh));
    }

    // Residuals against the upsampled coarser level.
    let mut laplacian = Vec::with_capacity(levels);
    for k in 0..levels - 1 {
        let fine = &gaussian[k];
        let upsampled = resize_image_bilinear(&gaussian[k + 1], fine.width(), fine.height());
        let data: Vec<f32> = fine
            .data()
            .iter()
            .zip(upsampled.data().iter())
            .map(|(f, u)| f - u)
            .collect();
        laplacian.push(Image::from_raw(fine.width(), fine.height(), data));
    }
    laplacian.push(gaussian.pop().unwrap());
    laplacian
}

/// Reconstruct an image from a Laplacian pyramid. The result is not clamped;
/// callers clamp after blending.
pub fn collapse_laplacian(pyramid: &[Image]) -> Image {
    let mut result = pyramid.last().unwrap().clone();
    for level in pyramid.iter().rev().skip(1) {
        let upsampled = resize_image_bilinear(&result, level.width(), level.height());
        let data: Vec<f32> = level
            .data()
            .iter()
            .zip(upsampled.data().iter())
            .map(|(l, u)| l + u)
            .collect();
        result = Image::from_raw(level.width(), level.height(), data);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(width: u32, height: u32) -> Image {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let fx = x as f32 / width as f32;
                let fy = y as f32 / height as f32;
                data.push(0.1 + 0.8 * fx);
                data.push(0.1 + 0.8 * fy);
                data.push(0.1 + 0.8 * (fx + fy) / 2.0);
            }
        }
        Image::from_raw(width, height, data)
    }

    #[test]
    fn test_gaussian_pyramid_shrinks_by_ratio() {
        let plane = vec![0.5f32; 64 * 48];
        let pyr = gaussian_pyramid_plane(&plane, 64, 48, 4, 2.0, 1.0);
        assert_eq!(pyr.len(), 4);
        assert_eq!((pyr[1].width, pyr[1].height), (32, 24));
        assert_eq!((pyr[2].width, pyr[2].height), (16, 12));
        assert_eq!((pyr[3].width, pyr[3].height), (8, 6));
    }

    #[test]
    fn test_gaussian_pyramid_never_reaches_zero() {
        let plane = vec![0.5f32; 4 * 4];
        let pyr = gaussian_pyramid_plane(&plane, 4, 4, 6, 3.0, 1.0);
        assert!(pyr.iter().all(|p| p.width >= 1 && p.height >= 1));
    }

    #[test]
    fn test_collapse_reconstructs_image() {
        let img = gradient_image(32, 32);
        let pyr = laplacian_pyramid_image(&img, 4, 2.0, 1.0);
        let rebuilt = collapse_laplacian(&pyr);
        assert_eq!(rebuilt.width(), 32);
        assert_eq!(rebuilt.height(), 32);
        // Build/collapse use the same operators, so reconstruction is exact
        // up to float rounding.
        assert!(
            img.mean_abs_diff(&rebuilt) < 1e-5,
            "reconstruction error {}",
            img.mean_abs_diff(&rebuilt)
        );
    }

    #[test]
    fn test_laplacian_top_level_is_low_resolution() {
        let img = gradient_image(64, 64);
        let pyr = laplacian_pyramid_image(&img, 3, 2.0, 1.0);
        assert_eq!(pyr.len(), 3);
        assert_eq!(pyr[2].width(), 16);
        assert_eq!(pyr[2].height(), 16);
    }
}
