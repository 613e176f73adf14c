//! Primitive routines over dense float images.
//!
//! Everything here operates on interleaved RGB buffers or single-channel
//! planes (`&[f32]` plus explicit width/height). Stages compose these
//! primitives; none of them allocate more than a few working buffers.

mod filter;
mod guided;
mod parallel;
mod pyramid;
mod resize;
mod stats;

/// Minimum number of pixels to trigger parallel processing.
pub(crate) const PARALLEL_THRESHOLD: usize = 30_000;

pub use filter::{
    box_filter_plane, gaussian_blur_image, gaussian_blur_plane, laplacian_plane, min_filter_plane,
    sobel_magnitude,
};
pub use guided::guided_filter;
pub use parallel::{parallel_fold_reduce, parallel_for_each_pixel_mut};
pub use pyramid::{
    collapse_laplacian, gaussian_pyramid_plane, laplacian_pyramid_image, Plane,
};
pub use resize::{downsample_area, resize_plane_bilinear};
pub use stats::{
    banded_mean, channel_means, entropy_bits, fraction_above, histogram, mean, minkowski_mean,
    mse, percentile, percentiles, psnr, saturated_fraction, split_channels, variance,
};
