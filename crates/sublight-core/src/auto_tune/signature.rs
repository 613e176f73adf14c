//! Scene signature computation.

use crate::image::Image;
use crate::models::{SceneSignature, SIGNATURE_PERCENTILES};
use crate::ops::{
    channel_means, laplacian_plane, mean, percentiles, saturated_fraction, sobel_magnitude,
    split_channels, variance,
};
use crate::stages::udcp_dark_channel;

/// Window used for the signature's dark channel statistics. Fixed so the
/// signature stays independent of stage parameters.
const DARK_CHANNEL_WINDOW: usize = 9;

/// Compute the scene signature of a source image. Pure and deterministic:
/// the same image always yields the same signature, with no dependence on
/// pipeline state or prior calls.
pub fn compute_signature(image: &Image) -> SceneSignature {
    let width = image.width() as usize;
    let height = image.height() as usize;

    let means = channel_means(image);
    let channels = split_channels(image);

    let mut channel_percentiles = [[0.0f32; 9]; 3];
    for (c, channel) in channels.iter().enumerate() {
        let values = percentiles(channel, &SIGNATURE_PERCENTILES);
        channel_percentiles[c].copy_from_slice(&values);
    }

    let luminance = image.luminance();
    let luminance_values = percentiles(&luminance, &SIGNATURE_PERCENTILES);
    let mut luminance_percentiles = [0.0f32; 9];
    luminance_percentiles.copy_from_slice(&luminance_values);

    let laplacian = laplacian_plane(&luminance, width, height);
    let sobel = sobel_magnitude(&luminance, width, height);

    let dark = udcp_dark_channel(image, DARK_CHANNEL_WINDOW);
    let dark_stats = percentiles(&dark, &[95.0]);

    let [r_mean, g_mean, b_mean] = means;
    let channel_distance = ((r_mean - g_mean).powi(2)
        + (g_mean - b_mean).powi(2)
        + (b_mean - r_mean).powi(2))
    .sqrt();

    // P95 - P5 of luminance: wide when the scene spans the tonal range.
    let hist_spread = luminance_percentiles[7] - luminance_percentiles[1];

    SceneSignature {
        width: image.width(),
        height: image.height(),
        means,
        percentiles: channel_percentiles,
        luminance_percentiles,
        red_blue_ratio: r_mean / b_mean.max(1e-6),
        red_green_ratio: r_mean / g_mean.max(1e-6),
        blue_red_ratio: b_mean / r_mean.max(1e-6),
        channel_distance,
        laplacian_variance: variance(&laplacian),
        sobel_mean: mean(&sobel),
        dark_channel_mean: mean(&dark),
        dark_channel_p95: dark_stats[0],
        hist_spread,
        saturated_fraction: saturated_fraction(image, 0.98),
    }
}
