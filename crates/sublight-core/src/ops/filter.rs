//! Spatial filters over single-channel planes.
//!
//! Planes are row-major `&[f32]` with explicit width/height. Borders are
//! handled by clamping coordinates (edge replication).

use crate::image::Image;

/// Local mean over a `(2r+1) x (2r+1)` window using an integral image.
/// O(1) per pixel regardless of radius.
pub fn box_filter_plane(plane: &[f32], width: usize, height: usize, radius: usize) -> Vec<f32> {
    debug_assert_eq!(plane.len(), width * height);

    // Summed-area table, one extra row/column of zeros.
    let iw = width + 1;
    let mut integral = vec![0.0f64; iw * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0.0f64;
        for x in 0..width {
            row_sum += plane[y * width + x] as f64;
            integral[(y + 1) * iw + (x + 1)] = integral[y * iw + (x + 1)] + row_sum;
        }
    }

    let mut output = vec![0.0f32; width * height];
    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(height);
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(width);
            let sum = integral[y1 * iw + x1] - integral[y0 * iw + x1] - integral[y1 * iw + x0]
                + integral[y0 * iw + x0];
            let count = ((y1 - y0) * (x1 - x0)) as f64;
            output[y * width + x] = (sum / count) as f32;
        }
    }
    output
}

/// Sampled Gaussian kernel, normalized; radius is `ceil(3 * sigma)`.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let mut kernel = Vec::with_capacity(2 * radius + 1);
    let denom = 2.0 * sigma * sigma;
    for i in 0..=2 * radius {
        let d = i as f32 - radius as f32;
        kernel.push((-d * d / denom).exp());
    }
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Separable Gaussian blur. Non-positive sigma returns the plane unchanged.
pub fn gaussian_blur_plane(plane: &[f32], width: usize, height: usize, sigma: f32) -> Vec<f32> {
    debug_assert_eq!(plane.len(), width * height);
    if sigma <= 0.0 {
        return plane.to_vec();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = kernel.len() / 2;

    // Horizontal pass.
    let mut horizontal = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - radius as isize).clamp(0, width as isize - 1);
                acc += weight * plane[y * width + sx as usize];
            }
            horizontal[y * width + x] = acc;
        }
    }

    // Vertical pass.
    let mut output = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - radius as isize).clamp(0, height as isize - 1);
                acc += weight * horizontal[sy as usize * width + x];
            }
            output[y * width + x] = acc;
        }
    }
    output
}

/// Gaussian blur applied independently to each RGB channel.
pub fn gaussian_blur_image(image: &Image, sigma: f32) -> Image {
    if sigma <= 0.0 {
        return image.clone();
    }
    let width = image.width() as usize;
    let height = image.height() as usize;
    let num_pixels = width * height;

    let mut output = vec![0.0f32; num_pixels * 3];
    let mut plane = vec![0.0f32; num_pixels];
    for c in 0..3 {
        for (i, px) in image.data().chunks_exact(3).enumerate() {
            plane[i] = px[c];
        }
        let blurred = gaussian_blur_plane(&plane, width, height, sigma);
        for (i, &v) in blurred.iter().enumerate() {
            output[i * 3 + c] = v;
        }
    }
    Image::from_raw(image.width(), image.height(), output)
}

/// Sobel gradient magnitude with 3x3 kernels, edge-replicated borders.
pub fn sobel_magnitude(plane: &[f32], width: usize, height: usize) -> Vec<f32> {
    debug_assert_eq!(plane.len(), width * height);
    let at = |x: isize, y: isize| -> f32 {
        let cx = x.clamp(0, width as isize - 1) as usize;
        let cy = y.clamp(0, height as isize - 1) as usize;
        plane[cy * width + cx]
    };

    let mut output = vec![0.0f32; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let gx = -at(x - 1, y - 1) + at(x + 1, y - 1) - 2.0 * at(x - 1, y)
                + 2.0 * at(x + 1, y)
                - at(x - 1, y + 1)
                + at(x + 1, y + 1);
            let gy = -at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1)
                + at(x - 1, y + 1)
                + 2.0 * at(x, y + 1)
                + at(x + 1, y + 1);
            output[y as usize * width + x as usize] = (gx * gx + gy * gy).sqrt();
        }
    }
    output
}

/// Four-neighbor Laplacian, edge-replicated borders.
pub fn laplacian_plane(plane: &[f32], width: usize, height: usize) -> Vec<f32> {
    debug_assert_eq!(plane.len(), width * height);
    let at = |x: isize, y: isize| -> f32 {
        let cx = x.clamp(0, width as isize - 1) as usize;
        let cy = y.clamp(0, height as isize - 1) as usize;
        plane[cy * width + cx]
    };

    let mut output = vec![0.0f32; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            output[y as usize * width + x as usize] =
                at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
        }
    }
    output
}

/// Minimum over a square window of odd side `window` (grayscale erosion).
/// Separable: horizontal then vertical sliding minimum.
pub fn min_filter_plane(plane: &[f32], width: usize, height: usize, window: usize) -> Vec<f32> {
    debug_assert_eq!(plane.len(), width * height);
    let radius = window / 2;
    if radius == 0 {
        return plane.to_vec();
    }

    let mut horizontal = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(width);
            let mut min = f32::INFINITY;
            for sx in x0..x1 {
                min = min.min(plane[y * width + sx]);
            }
            horizontal[y * width + x] = min;
        }
    }

    let mut output = vec![0.0f32; width * height];
    for y in 0..height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(height);
        for x in 0..width {
            let mut min = f32::INFINITY;
            for sy in y0..y1 {
                min = min.min(horizontal[sy * width + x]);
            }
            output[y * width + x] = min;
        }
    }
    output
}
