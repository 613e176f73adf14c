//! Guided filter for edge-preserving refinement.
//!
//! Used to refine the UDCP transmission map so its edges align with the
//! guidance image instead of the blocky patch structure left by the
//! window-minimum dark channel.

use super::box_filter_plane;

/// Edge-preserving smoothing of `input` steered by `guide`.
///
/// Solves for per-window linear coefficients `a`, `b` minimizing the
/// reconstruction error `a * guide + b ~ input`, then averages the
/// coefficients over all windows covering each pixel.
///
/// `radius` controls the window size, `eps` the regularization (larger means
/// more smoothing and less edge preservation).
pub fn guided_filter(
    guide: &[f32],
    input: &[f32],
    width: usize,
    height: usize,
    radius: usize,
    eps: f32,
) -> Vec<f32> {
    debug_assert_eq!(guide.len(), width * height);
    debug_assert_eq!(input.len(), width * height);

    let mean_guide = box_filter_plane(guide, width, height, radius);
    let mean_input = box_filter_plane(input, width, height, radius);

    // Working buffers are dropped as soon as they are consumed; peak extra
    // allocation must stay below 3x the source image.
    let product: Vec<f32> = guide.iter().zip(input.iter()).map(|(g, p)| g * p).collect();
    let corr_gp = box_filter_plane(&product, width, height, radius);
    drop(product);
    let guide_sq: Vec<f32> = guide.iter().map(|g| g * g).collect();
    let corr_gg = box_filter_plane(&guide_sq, width, height, radius);
    drop(guide_sq);

    let mut a = vec![0.0f32; width * height];
    let mut b = vec![0.0f32; width * height];
    for i in 0..width * height {
        let cov_gp = corr_gp[i] - mean_guide[i] * mean_input[i];
        let var_g = corr_gg[i] - mean_guide[i] * mean_guide[i];
        a[i] = cov_gp / (var_g + eps);
        b[i] = mean_input[i] - a[i] * mean_guide[i];
    }
    drop(corr_gp);
    drop(corr_gg);

    let mean_a = box_filter_plane(&a, width, height, radius);
    let mean_b = box_filter_plane(&b, width, height, radius);

    (0..width * height)
        .map(|i| mean_a[i] * guide[i] + mean_b[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_input_passes_through() {
        let guide: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();
        let input = vec![0.5f32; 64];
        let out = guided_filter(&guide, &input, 8, 8, 2, 1e-3);
        for v in out {
            assert!((v - 0.5).abs() < 1e-3, "expected ~0.5, got {}", v);
        }
    }

    #[test]
    fn test_smooths_noise_on_flat_guide() {
        // Flat guide: the filter degenerates to a box mean of the input.
        let guide = vec![0.5f32; 100];
        let input: Vec<f32> = (0..100)
            .map(|i| if i % 2 == 0 { 0.4 } else { 0.6 })
            .collect();
        let out = guided_filter(&guide, &input, 10, 10, 3, 1e-3);
        let spread = out
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        assert!(spread.1 - spread.0 < 0.1, "output spread {:?}", spread);
    }

    #[test]
    fn test_preserves_guide_edge() {
        // Step in both guide and input: the edge must survive filtering.
        let mut guide = vec![0.0f32; 16 * 16];
        let mut input = vec![0.1f32; 16 * 16];
        for y in 0..16 {
            for x in 8..16 {
                guide[y * 16 + x] = 1.0;
                input[y * 16 + x] = 0.9;
            }
        }
        let out = guided_filter(&guide, &input, 16, 16, 3, 1e-4);
        let left = out[8 * 16 + 2];
        let right = out[8 * 16 + 13];
        assert!(right - left > 0.5, "edge flattened: {} vs {}", left, right);
    }
}
