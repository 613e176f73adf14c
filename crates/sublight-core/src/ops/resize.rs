//! Resampling: area-average downsampling for previews, bilinear for pyramids.

use crate::image::Image;

/// Downsample so the longest side is at most `max_dimension`, using
/// fractional area averaging. Returns the (possibly unchanged) image and the
/// applied scale factor (1.0 when no resampling happened).
pub fn downsample_area(image: &Image, max_dimension: u32) -> (Image, f32) {
    let (w, h) = (image.width(), image.height());
    let long_axis = w.max(h);
    if long_axis <= max_dimension {
        return (image.clone(), 1.0);
    }

    let scale = max_dimension as f32 / long_axis as f32;
    let new_w = ((w as f32 * scale).round() as u32).max(1);
    let new_h = ((h as f32 * scale).round() as u32).max(1);

    let src_w = w as usize;
    let src_h = h as usize;
    let dst_w = new_w as usize;
    let dst_h = new_h as usize;
    let data = image.data();

    let mut output = vec![0.0f32; dst_w * dst_h * 3];
    for dy in 0..dst_h {
        let sy0 = dy as f64 * src_h as f64 / dst_h as f64;
        let sy1 = (dy + 1) as f64 * src_h as f64 / dst_h as f64;
        for dx in 0..dst_w {
            let sx0 = dx as f64 * src_w as f64 / dst_w as f64;
            let sx1 = (dx + 1) as f64 * src_w as f64 / dst_w as f64;

            let mut acc = [0.0f64; 3];
            let mut area = 0.0f64;
            let iy0 = sy0.floor() as usize;
            let iy1 = (sy1.ceil() as usize).min(src_h);
            let ix0 = sx0.floor() as usize;
            let ix1 = (sx1.ceil() as usize).min(src_w);
            for iy in iy0..iy1 {
                let wy = overlap(iy as f64, sy0, sy1);
                for ix in ix0..ix1 {
                    let weight = wy * overlap(ix as f64, sx0, sx1);
                    let idx = (iy * src_w + ix) * 3;
                    acc[0] += weight * data[idx] as f64;
                    acc[1] += weight * data[idx + 1] as f64;
                    acc[2] += weight * data[idx + 2] as f64;
                    area += weight;
                }
            }
            let out_idx = (dy * dst_w + dx) * 3;
            for c in 0..3 {
                output[out_idx + c] = (acc[c] / area) as f32;
            }
        }
    }

    (Image::from_raw(new_w, new_h, output), scale)
}

/// Overlap length of the unit cell `[i, i+1)` with the span `[lo, hi)`.
fn overlap(i: f64, lo: f64, hi: f64) -> f64 {
    ((i + 1.0).min(hi) - i.max(lo)).max(0.0)
}

/// Bilinear resampling of a single plane to a new size.
pub fn resize_plane_bilinear(
    src: &[f32],
    width: usize,
    height: usize,
    new_width: usize,
    new_height: usize,
) -> Vec<f32> {
    debug_assert_eq!(src.len(), width * height);
    if new_width == width && new_height == height {
        return src.to_vec();
    }

    let mut output = vec![0.0f32; new_width * new_height];
    let x_ratio = width as f32 / new_width as f32;
    let y_ratio = height as f32 / new_height as f32;

    for dy in 0..new_height {
        // Sample at cell centers for symmetric up/down mapping.
        let sy = ((dy as f32 + 0.5) * y_ratio - 0.5).max(0.0);
        let y0 = (sy as usize).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let fy = sy - y0 as f32;
        for dx in 0..new_width {
            let sx = ((dx as f32 + 0.5) * x_ratio - 0.5).max(0.0);
            let x0 = (sx as usize).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let fx = sx - x0 as f32;

            let top = src[y0 * width + x0] * (1.0 - fx) + src[y0 * width + x1] * fx;
            let bottom = src[y1 * width + x0] * (1.0 - fx) + src[y1 * width + x1] * fx;
            output[dy * new_width + dx] = top * (1.0 - fy) + bottom * fy;
        }
    }
    output
}

/// Bilinear resampling of an RGB image, channel by channel.
pub(crate) fn resize_image_bilinear(image: &Image, new_width: u32, new_height: u32) -> Image {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let (nw, nh) = (new_width as usize, new_height as usize);

    let mut output = vec![0.0f32; nw * nh * 3];
    let mut plane = vec![0.0f32; width * height];
    for c in 0..3 {
        for (i, px) in image.data().chunks_exact(3).enumerate() {
            plane[i] = px[c];
        }
        let resized = resize_plane_bilinear(&plane, width, height, nw, nh);
        for (i, &v) in resized.iter().enumerate() {
            output[i * 3 + c] = v;
        }
    }
    Image::from_raw(new_width, new_height, output)
}
