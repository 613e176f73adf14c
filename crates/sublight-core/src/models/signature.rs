//! Scene signature: stage-agnostic statistics computed once per source image
//! and shared by all auto-tune routines.

use std::fmt;

/// Percentile points captured per channel and for luminance.
pub const SIGNATURE_PERCENTILES: [f32; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0];

/// Derived statistics of a source image. Immutable once computed; recomputed
/// only when the source changes, never from a processed image.
#[derive(Debug, Clone)]
pub struct SceneSignature {
    pub width: u32,
    pub height: u32,

    /// Per-channel means (R, G, B).
    pub means: [f32; 3],

    /// Per-channel values at [`SIGNATURE_PERCENTILES`].
    pub percentiles: [[f32; 9]; 3],

    /// Luminance values at [`SIGNATURE_PERCENTILES`].
    pub luminance_percentiles: [f32; 9],

    /// Spectral ratios between channel means.
    pub red_blue_ratio: f32,
    pub red_green_ratio: f32,
    pub blue_red_ratio: f32,

    /// Euclidean distance between the three channel means.
    pub channel_distance: f32,

    /// Variance of the luminance Laplacian; noise/detail proxy.
    pub laplacian_variance: f32,

    /// Mean Sobel gradient magnitude of luminance; edge strength.
    pub sobel_mean: f32,

    /// Dark channel statistics (window-minimum over channels).
    pub dark_channel_mean: f32,
    pub dark_channel_p95: f32,

    /// Luminance P95 - P5; histogram spread / global contrast proxy.
    pub hist_spread: f32,

    /// Fraction of pixels with any channel above 0.98.
    pub saturated_fraction: f32,
}

impl SceneSignature {
    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Channel value at one of the captured percentile points.
    /// Panics if `p` is not in [`SIGNATURE_PERCENTILES`].
    pub fn channel_percentile(&self, channel: usize, p: f32) -> f32 {
        let idx = SIGNATURE_PERCENTILES
            .iter()
            .position(|&x| (x - p).abs() < 1e-6)
            .expect("percentile not captured in signature");
        self.percentiles[channel][idx]
    }

    /// Share of a channel mean in the sum of all three.
    fn ratio(&self, channel: usize) -> f32 {
        let total = self.means[0] + self.means[1] + self.means[2] + 1e-6;
        self.means[channel] / total
    }

    pub fn r_ratio(&self) -> f32 {
        self.ratio(0)
    }

    pub fn g_ratio(&self) -> f32 {
        self.ratio(1)
    }

    pub fn b_ratio(&self) -> f32 {
        self.ratio(2)
    }
}

/// Coarse water-body classification derived from the scene signature,
/// driving method selection in white balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterTypeTag {
    /// Green-dominant freshwater.
    Lake,
    /// Blue-depleted deep ocean.
    OceanDeep,
    /// Red-depleted tropical water.
    Tropical,
    /// High edge strength and wide histogram.
    ClearHighContrast,
    Standard,
}

impl fmt::Display for WaterTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaterTypeTag::Lake => "lake",
            WaterTypeTag::OceanDeep => "ocean_deep",
            WaterTypeTag::Tropical => "tropical",
            WaterTypeTag::ClearHighContrast => "clear_high_contrast",
            WaterTypeTag::Standard => "standard",
        };
        f.write_str(name)
    }
}
