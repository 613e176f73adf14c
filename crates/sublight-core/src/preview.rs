//! Preview and cache management.
//!
//! Holds the full-resolution source and a downsampled preview, plus one
//! processed cache per resolution. Every cached artifact stores the
//! configuration fingerprint it was produced under; every read compares
//! fingerprints instead of relying on cache emptiness, and results are only
//! installed if the fingerprint still matches at install time.

use crate::cancel::CancelToken;
use crate::config::{ConfigFingerprint, PipelineConfig};
use crate::engine::{self, RunReport};
use crate::error::Result;
use crate::image::Image;
use crate::ops::downsample_area;
use crate::progress::ProgressFn;

/// Longest preview side in pixels.
pub const PREVIEW_MAX_DIMENSION: u32 = 1024;

/// Current source image with preview and processed caches.
#[derive(Debug)]
pub struct PreviewState {
    source: Image,
    source_preview: Image,
    scale_factor: f32,
    processed_full: Option<(Image, ConfigFingerprint)>,
    processed_preview: Option<(Image, ConfigFingerprint)>,
}

impl PreviewState {
    /// Adopt a source image: computes the preview and leaves both processed
    /// caches empty.
    pub fn new(source: Image) -> Self {
        let (source_preview, scale_factor) = downsample_area(&source, PREVIEW_MAX_DIMENSION);
        Self {
            source,
            source_preview,
            scale_factor,
            processed_full: None,
            processed_preview: None,
        }
    }

    /// Replace the source, resetting all caches and the preview.
    pub fn set_source(&mut self, source: Image) {
        *self = Self::new(source);
    }

    /// Drop both processed caches.
    pub fn invalidate(&mut self) {
        self.processed_full = None;
        self.processed_preview = None;
    }

    pub fn source(&self) -> &Image {
        &self.source
    }

    pub fn source_preview(&self) -> &Image {
        &self.source_preview
    }

    /// Preview scale relative to the source (1.0 when no downsampling).
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Processed preview: cached when the fingerprint matches, otherwise a
    /// fresh engine run on the preview source.
    pub fn get_processed_preview(
        &mut self,
        config: &PipelineConfig,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(Image, RunReport)> {
        let fingerprint = config.fingerprint();
        if let Some((cached, cached_fp)) = &self.processed_preview {
            if *cached_fp == fingerprint {
                return Ok((cached.clone(), RunReport::default()));
            }
        }

        let (image, report) = engine::process(&self.source_preview, config, cancel, progress)?;

        // Double-checked install: discard the result silently if the live
        // configuration moved on while the engine ran.
        if config.fingerprint() == fingerprint {
            self.processed_preview = Some((image.clone(), fingerprint));
        }
        Ok((image, report))
    }

    /// Processed full-resolution image, with its own independent cache.
    pub fn get_processed_full(
        &mut self,
        config: &PipelineConfig,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(Image, RunReport)> {
        let fingerprint = config.fingerprint();
        if let Some((cached, cached_fp)) = &self.processed_full {
            if *cached_fp == fingerprint {
                return Ok((cached.clone(), RunReport::default()));
            }
        }

        let (image, report) = engine::process(&self.source, config, cancel, progress)?;

        if config.fingerprint() == fingerprint {
            self.processed_full = Some((image.clone(), fingerprint));
        }
        Ok((image, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageId;
    use crate::models::ParameterValue;

    /// Green-cast gradient: the red gain hits the white balance clamp, so
    /// `max_gain` changes are visible in the output.
    fn small_gradient(width: u32, height: u32) -> Image {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(0.05 + 0.1 * x as f32 / width as f32);
                data.push(0.6 + 0.3 * y as f32 / height as f32);
                data.push(0.45);
            }
        }
        Image::from_raw(width, height, data)
    }

    /// Cheap config: only white balance enabled.
    fn wb_only_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        for stage in StageId::ALL {
            config.set_enabled(stage, stage == StageId::WhiteBalance);
        }
        config
    }

    #[test]
    fn test_preview_capped_at_max_dimension() {
        let state = PreviewState::new(small_gradient(2048, 1024));
        assert_eq!(state.source_preview().width(), PREVIEW_MAX_DIMENSION);
        assert_eq!(state.source_preview().height(), 512);
        assert!((state.scale_factor() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_small_source_kept_as_is() {
        let state = PreviewState::new(small_gradient(64, 48));
        assert_eq!(state.source_preview().width(), 64);
        assert!((state.scale_factor() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preview_cache_hit_returns_same_image() {
        let mut state = PreviewState::new(small_gradient(64, 48));
        let config = wb_only_config();
        let cancel = CancelToken::new();

        let (first, _) = state
            .get_processed_preview(&config, &cancel, None)
            .unwrap();
        let (second, _) = state
            .get_processed_preview(&config, &cancel, None)
            .unwrap();
        assert_eq!(first, second);
        assert!(state.processed_preview.is_some());
    }

    #[test]
    fn test_parameter_write_invalidates_both_caches() {
        let mut state = PreviewState::new(small_gradient(64, 48));
        let mut config = wb_only_config();
        let cancel = CancelToken::new();

        let (preview_before, _) = state
            .get_processed_preview(&config, &cancel, None)
            .unwrap();
        let (full_before, _) = state.get_processed_full(&config, &cancel, None).unwrap();

        config
            .set_parameter(
                StageId::WhiteBalance,
                "max_gain",
                &ParameterValue::Float(3.5),
            )
            .unwrap();

        // Both reads must recompute: the stored fingerprints no longer match.
        let (preview_after, _) = state
            .get_processed_preview(&config, &cancel, None)
            .unwrap();
        let (full_after, _) = state.get_processed_full(&config, &cancel, None).unwrap();

        assert!(preview_before.mean_abs_diff(&preview_after) > 0.0);
        assert!(full_before.mean_abs_diff(&full_after) > 0.0);
    }

    #[test]
    fn test_set_source_resets_caches() {
        let mut state = PreviewState::new(small_gradient(64, 48));
        let config = wb_only_config();
        let cancel = CancelToken::new();
        state
            .get_processed_preview(&config, &cancel, None)
            .unwrap();
        state.set_source(small_gradient(32, 32));
        assert!(state.processed_preview.is_none());
        assert!(state.processed_full.is_none());
        assert_eq!(state.source_preview().width(), 32);
    }

    #[test]
    fn test_invalidate_clears_caches() {
        let mut state = PreviewState::new(small_gradient(64, 48));
        let config = wb_only_config();
        let cancel = CancelToken::new();
        state
            .get_processed_preview(&config, &cancel, None)
            .unwrap();
        state.get_processed_full(&config, &cancel, None).unwrap();
        state.invalidate();
        assert!(state.processed_preview.is_none());
        assert!(state.processed_full.is_none());
    }

    #[test]
    fn test_cancellation_leaves_caches_untouched() {
        let mut state = PreviewState::new(small_gradient(64, 48));
        let config = wb_only_config();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = state.get_processed_preview(&config, &cancel, None);
        assert!(matches!(result, Err(crate::ProcessError::Cancelled)));
        assert!(state.processed_preview.is_none());
    }
}
