//! Enhancement session: the engine-owned context behind the processing API.
//!
//! One session owns the pipeline configuration, the preview/cache state, and
//! the scene signature of the current source. All operations are synchronous;
//! hosts run the long ones on a worker thread and pass a progress callback.

use std::path::Path;

use crate::auto_tune;
use crate::cancel::CancelToken;
use crate::config::{self, PipelineConfig, StageId};
use crate::engine::RunReport;
use crate::error::{ProcessError, Result};
use crate::image::Image;
use crate::models::{ParameterValue, QualityReport, SceneSignature, WaterTypeTag};
use crate::preview::PreviewState;
use crate::progress::ProgressFn;
use crate::quality;
use crate::stages::stage_for;
use crate::video::{self, FrameSink, FrameSource, VideoReport};

/// Interactive enhancement session over one source image (or a video run).
#[derive(Default)]
pub struct EnhanceSession {
    config: PipelineConfig,
    preview: Option<PreviewState>,
    signature: Option<SceneSignature>,
    water_type: Option<WaterTypeTag>,
}

impl EnhanceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a decoded source image: rebuilds the preview, recomputes the
    /// scene signature and water classification, and runs the tuners of all
    /// auto-tune-enabled stages (tune-on-load).
    pub fn load_source(&mut self, image: Image) -> Result<()> {
        let signature = auto_tune::compute_signature(&image);
        self.water_type = Some(auto_tune::classify_water(&signature));

        match &mut self.preview {
            Some(state) => state.set_source(image),
            None => self.preview = Some(PreviewState::new(image)),
        }

        auto_tune::tune(&mut self.config, &signature);
        self.signature = Some(signature);
        Ok(())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn signature(&self) -> Option<&SceneSignature> {
        self.signature.as_ref()
    }

    pub fn water_type(&self) -> Option<WaterTypeTag> {
        self.water_type
    }

    /// Set a stage parameter by name. The value is coerced and clamped; the
    /// processed caches turn stale through the fingerprint change. Parameter
    /// writes never re-run auto-tune.
    pub fn set_parameter(
        &mut self,
        stage: StageId,
        name: &str,
        value: &ParameterValue,
    ) -> Result<()> {
        self.config.set_parameter(stage, name, value)
    }

    pub fn get_parameter(&self, stage: StageId, name: &str) -> Option<ParameterValue> {
        self.config.get_parameter(stage, name)
    }

    pub fn set_enabled(&mut self, stage: StageId, enabled: bool) {
        self.config.set_enabled(stage, enabled);
    }

    /// Flip a stage's auto-tune flag. Turning it on re-runs that stage's
    /// tuner immediately from the cached signature.
    pub fn set_auto_tune(&mut self, stage: StageId, enabled: bool) {
        self.config.set_auto_tune(stage, enabled);
        if enabled {
            if let Some(signature) = &self.signature {
                auto_tune::tune_stage(&mut self.config, signature, stage);
            }
        }
    }

    /// Toggle auto-tune on all stages; enabling re-tunes them immediately.
    pub fn global_auto_tune(&mut self, enabled: bool) {
        auto_tune::global_auto_tune(&mut self.config, enabled);
        if enabled {
            if let Some(signature) = self.signature.clone() {
                auto_tune::tune(&mut self.config, &signature);
            }
        }
    }

    /// Process the preview-resolution image (cached when unchanged).
    pub fn process_preview(
        &mut self,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<Image> {
        let state = self.preview.as_mut().ok_or_else(no_source)?;
        let (image, _) = state.get_processed_preview(&self.config, cancel, progress)?;
        Ok(image)
    }

    /// Process at full resolution (cached when unchanged).
    pub fn process_full(
        &mut self,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<Image> {
        let state = self.preview.as_mut().ok_or_else(no_source)?;
        let (image, _) = state.get_processed_full(&self.config, cancel, progress)?;
        Ok(image)
    }

    /// Run the quality analyzer on (original preview, processed preview),
    /// processing the preview first if its cache is stale.
    pub fn analyze_quality(&mut self, cancel: &CancelToken) -> Result<QualityReport> {
        let state = self.preview.as_mut().ok_or_else(no_source)?;
        let (processed, _) = state.get_processed_preview(&self.config, cancel, None)?;
        quality::analyze_quality(state.source_preview(), &processed, cancel)
    }

    /// Process a video stream with the current configuration, frozen for the
    /// whole run. No per-frame re-tuning.
    pub fn process_video(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<VideoReport> {
        video::process_video(source, sink, &self.config, cancel, progress)
    }

    /// Report of the last processing run is carried by the preview layer;
    /// hosts that need stage-failure metadata call through here.
    pub fn process_preview_with_report(
        &mut self,
        cancel: &CancelToken,
        progress: Option<&ProgressFn>,
    ) -> Result<(Image, RunReport)> {
        let state = self.preview.as_mut().ok_or_else(no_source)?;
        state.get_processed_preview(&self.config, cancel, progress)
    }

    /// Human-readable description of the enabled stages in pipeline order.
    pub fn describe_pipeline(&self) -> Vec<String> {
        StageId::ALL
            .into_iter()
            .filter(|&id| self.config.is_enabled(id))
            .map(|id| stage_for(id).describe(&self.config))
            .collect()
    }

    /// Persist the configuration as versioned JSON.
    pub fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        config::save_config(&self.config, path)
    }

    /// Load a configuration file, returning non-fatal warnings. The caches
    /// turn stale through the fingerprint change.
    pub fn load_config<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<String>> {
        let (config, warnings) = config::load_config(path)?;
        self.config = config;
        Ok(warnings)
    }
}

fn no_source() -> ProcessError {
    ProcessError::InvalidInput("no source image loaded".to_string())
}
