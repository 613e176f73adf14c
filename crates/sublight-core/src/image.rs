//! Dense RGB float image buffer.
//!
//! Images are interleaved RGB `f32` in `[0, 1]`, row-major. This is the only
//! representation crossing the public API; stages receive and return it.

use crate::error::{ProcessError, Result};

/// Relative luminance weights (ITU-R BT.601), used for grayscale planes.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// A three-channel float image, values nominally in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Image {
    /// Wrap decoded RGB data. Validates shape, non-zero size, and finiteness.
    pub fn from_data(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ProcessError::InvalidInput(format!(
                "zero-sized image ({}x{})",
                width, height
            )));
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(ProcessError::InvalidInput(format!(
                "data length {} does not match {}x{}x3 = {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ProcessError::InvalidInput(
                "image contains non-finite values".to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build an image filled with a constant color. Test and tooling helper.
    pub fn constant(width: u32, height: u32, rgb: [f32; 3]) -> Self {
        let num_pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(num_pixels * 3);
        for _ in 0..num_pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Internal constructor for buffers already known to be well-formed.
    pub(crate) fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * 3);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Pixel accessor for tests and sampling; `x < width`, `y < height`.
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Extract the luminance plane (BT.601 weights), same length as pixels.
    pub fn luminance(&self) -> Vec<f32> {
        self.data
            .chunks_exact(3)
            .map(|px| LUMA_WEIGHTS[0] * px[0] + LUMA_WEIGHTS[1] * px[1] + LUMA_WEIGHTS[2] * px[2])
            .collect()
    }

    /// Clamp all samples into `[0, 1]`.
    pub fn clamp_unit(&mut self) {
        for v in self.data.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
    }

    /// Mean absolute per-sample difference against another image of the same
    /// shape. Used by tests and the fusion sensitivity property.
    pub fn mean_abs_diff(&self, other: &Image) -> f32 {
        assert_eq!(self.data.len(), other.data.len());
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs() as f64)
            .sum();
        (sum / self.data.len() as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_validates_length() {
        let result = Image::from_data(2, 2, vec![0.0; 11]);
        assert!(matches!(result, Err(ProcessError::InvalidInput(_))));
    }

    #[test]
    fn test_from_data_rejects_zero_size() {
        let result = Image::from_data(0, 4, vec![]);
        assert!(matches!(result, Err(ProcessError::InvalidInput(_))));
    }

    #[test]
    fn test_from_data_rejects_non_finite() {
        let mut data = vec![0.5; 12];
        data[7] = f32::NAN;
        let result = Image::from_data(2, 2, data);
        assert!(matches!(result, Err(ProcessError::InvalidInput(_))));
    }

    #[test]
    fn test_constant_and_pixel() {
        let img = Image::constant(3, 2, [0.1, 0.2, 0.3]);
        assert_eq!(img.num_pixels(), 6);
        assert_eq!(img.pixel(2, 1), [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_luminance_of_gray_is_identity() {
        let img = Image::constant(4, 4, [0.5, 0.5, 0.5]);
        let luma = img.luminance();
        for v in luma {
            assert!((v - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mean_abs_diff() {
        let a = Image::constant(2, 2, [0.5, 0.5, 0.5]);
        let b = Image::constant(2, 2, [0.6, 0.5, 0.4]);
        let diff = a.mean_abs_diff(&b);
        assert!((diff - (0.1 + 0.0 + 0.1) / 3.0).abs() < 1e-6);
    }
}
