//! Channel statistics, percentiles, histograms, and quality metrics.

use crate::image::Image;

use super::parallel_fold_reduce;

/// Separate an interleaved RGB buffer into three channel vectors.
pub fn split_channels(image: &Image) -> [Vec<f32>; 3] {
    let num_pixels = image.num_pixels();
    let mut channels: [Vec<f32>; 3] = [
        Vec::with_capacity(num_pixels),
        Vec::with_capacity(num_pixels),
        Vec::with_capacity(num_pixels),
    ];
    for pixel in image.data().chunks_exact(3) {
        channels[0].push(pixel[0]);
        channels[1].push(pixel[1]);
        channels[2].push(pixel[2]);
    }
    channels
}

/// Per-channel means, accumulated in f64 for stability.
pub fn channel_means(image: &Image) -> [f32; 3] {
    let num_pixels = image.num_pixels();
    if num_pixels == 0 {
        return [0.0; 3];
    }
    let (r, g, b) = parallel_fold_reduce(
        image.data(),
        3,
        || (0.0f64, 0.0f64, 0.0f64),
        |acc, px| {
            (
                acc.0 + px[0] as f64,
                acc.1 + px[1] as f64,
                acc.2 + px[2] as f64,
            )
        },
        |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2),
    );
    let n = num_pixels as f64;
    [(r / n) as f32, (g / n) as f32, (b / n) as f32]
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    (sum / values.len() as f64) as f32
}

pub fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values) as f64;
    let sum: f64 = values.iter().map(|&v| (v as f64 - m).powi(2)).sum();
    (sum / values.len() as f64) as f32
}

/// Value at percentile `p` in `[0, 100]`, via partial sort on a copy.
pub fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    let idx = percentile_index(sorted.len(), p);
    sorted.select_nth_unstable_by(idx, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted[idx]
}

/// Values at several percentiles, sorting once.
pub fn percentiles(values: &[f32], ps: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return vec![0.0; ps.len()];
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    ps.iter()
        .map(|&p| sorted[percentile_index(sorted.len(), p)])
        .collect()
}

fn percentile_index(len: usize, p: f32) -> usize {
    (((p / 100.0) * (len - 1) as f32).round() as usize).min(len - 1)
}

/// Mean of the values lying between the `p`-th and `(100 - p)`-th
/// percentiles. Robust channel estimate used by the white balance methods.
pub fn banded_mean(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let lo_pct = p.min(100.0 - p).clamp(0.0, 50.0);
    let hi_pct = 100.0 - lo_pct;
    let bounds = percentiles(values, &[lo_pct, hi_pct]);
    let (lo, hi) = (bounds[0], bounds[1]);

    let mut sum = 0.0f64;
    let mut count = 0usize;
    for &v in values {
        if v >= lo && v <= hi {
            sum += v as f64;
            count += 1;
        }
    }
    if count == 0 {
        percentile(values, 50.0)
    } else {
        (sum / count as f64) as f32
    }
}

/// Minkowski mean `(mean(v^p))^(1/p)`; `p = 1` is the arithmetic mean and
/// large `p` approaches the maximum.
pub fn minkowski_mean(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values
        .iter()
        .map(|&v| (v.max(0.0) as f64 + 1e-6).powf(p as f64))
        .sum();
    ((sum / values.len() as f64).powf(1.0 / p as f64)) as f32
}

/// Histogram over `[0, 1]` with the given number of bins.
pub fn histogram(values: &[f32], bins: usize) -> Vec<u32> {
    let mut hist = vec![0u32; bins];
    for &v in values {
        let clamped = v.clamp(0.0, 1.0);
        let idx = ((clamped * (bins - 1) as f32) as usize).min(bins - 1);
        hist[idx] += 1;
    }
    hist
}

/// Shannon entropy of a histogram, in bits.
pub fn entropy_bits(hist: &[u32]) -> f32 {
    let total: u64 = hist.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return 0.0;
    }
    let mut entropy = 0.0f64;
    for &count in hist {
        if count > 0 {
            let p = count as f64 / total as f64;
            entropy -= p * p.log2();
        }
    }
    entropy as f32
}

/// Fraction of values strictly above a threshold.
pub fn fraction_above(values: &[f32], threshold: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let count = values.iter().filter(|&&v| v > threshold).count();
    count as f32 / values.len() as f32
}

/// Fraction of pixels with any channel above `threshold`.
pub fn saturated_fraction(image: &Image, threshold: f32) -> f32 {
    let num_pixels = image.num_pixels();
    if num_pixels == 0 {
        return 0.0;
    }
    let count = image
        .data()
        .chunks_exact(3)
        .filter(|px| px[0] > threshold || px[1] > threshold || px[2] > threshold)
        .count();
    count as f32 / num_pixels as f32
}

/// Mean squared error between two images of the same shape.
pub fn mse(a: &Image, b: &Image) -> f32 {
    assert_eq!(a.data().len(), b.data().len());
    if a.data().is_empty() {
        return 0.0;
    }
    let sum: f64 = a
        .data()
        .iter()
        .zip(b.data().iter())
        .map(|(x, y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum();
    (sum / a.data().len() as f64) as f32
}

/// Peak signal-to-noise ratio in dB for unit-range images.
pub fn psnr(reference: &Image, candidate: &Image) -> f32 {
    let err = mse(reference, candidate);
    if err <= f32::EPSILON {
        return f32::INFINITY;
    }
    10.0 * (1.0 / err).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_means_constant() {
        let img = Image::constant(8, 8, [0.2, 0.4, 0.6]);
        let means = channel_means(&img);
        assert!((means[0] - 0.2).abs() < 1e-6);
        assert!((means[1] - 0.4).abs() < 1e-6);
        assert!((means[2] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_percentile_endpoints() {
        let values: Vec<f32> = (0..101).map(|i| i as f32 / 100.0).collect();
        assert!((percentile(&values, 0.0) - 0.0).abs() < 1e-6);
        assert!((percentile(&values, 50.0) - 0.5).abs() < 1e-6);
        assert!((percentile(&values, 100.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_banded_mean_excludes_outliers() {
        // 1% outliers at 100.0 should not move a 10th-percentile banded mean.
        let mut values = vec![0.5f32; 990];
        values.extend(vec![100.0f32; 10]);
        let banded = banded_mean(&values, 10.0);
        assert!((banded - 0.5).abs() < 1e-3, "banded mean was {}", banded);
    }

    #[test]
    fn test_banded_mean_median_collapse() {
        let values = vec![0.1f32, 0.2, 0.3, 0.4, 0.9];
        // p = 50 collapses the band to the median neighborhood.
        let banded = banded_mean(&values, 50.0);
        assert!((banded - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_minkowski_mean_limits() {
        let values = vec![0.1f32, 0.5, 0.9];
        let m1 = minkowski_mean(&values, 1.0);
        assert!((m1 - 0.5).abs() < 1e-3);
        // Large p approaches the max.
        let m20 = minkowski_mean(&values, 20.0);
        assert!(m20 > 0.8);
    }

    #[test]
    fn test_entropy_uniform_vs_peaked() {
        let uniform = vec![10u32; 256];
        let mut peaked = vec![0u32; 256];
        peaked[128] = 2560;
        assert!(entropy_bits(&uniform) > entropy_bits(&peaked));
        assert!((entropy_bits(&uniform) - 8.0).abs() < 1e-3);
    }

    #[test]
    fn test_psnr_identity_is_infinite() {
        let img = Image::constant(4, 4, [0.3, 0.6, 0.9]);
        assert!(psnr(&img, &img).is_infinite());
    }

    #[test]
    fn test_psnr_known_error() {
        let a = Image::constant(10, 10, [0.5, 0.5, 0.5]);
        let b = Image::constant(10, 10, [0.6, 0.6, 0.6]);
        // MSE = 0.01 -> PSNR = 20 dB.
        assert!((psnr(&a, &b) - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_saturated_fraction() {
        let mut img = Image::constant(2, 2, [0.5, 0.5, 0.5]);
        img.data_mut()[0] = 0.99;
        assert!((saturated_fraction(&img, 0.98) - 0.25).abs() < 1e-6);
    }
}
