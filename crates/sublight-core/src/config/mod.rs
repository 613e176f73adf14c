//! Pipeline configuration: stage order, enabled/auto-tune flags, typed
//! parameters, and the fingerprint used for cache validity.

mod persist;


pub use persist::{
    config_from_json, config_to_json, list_presets, load_config, load_preset, save_config,
    save_preset, validate_preset_name, CONFIG_VERSION,
};

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, Result};
use crate::models::{
    BeerLambertParams, ClaheParams, ColorRebalanceParams, FusionParams, ParamDescriptor,
    ParameterValue, UdcpParams, WhiteBalanceParams,
};

/// Identifier of a pipeline stage. The processing order is fixed to
/// [`StageId::ALL`]; stages may be disabled but never reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    WhiteBalance,
    Udcp,
    BeerLambert,
    ColorRebalance,
    Clahe,
    MultiscaleFusion,
}

impl StageId {
    /// The fixed execution order. White balance neutralizes the cast before
    /// the physical models run; fusion combines the already-corrected image.
    pub const ALL: [StageId; 6] = [
        StageId::WhiteBalance,
        StageId::Udcp,
        StageId::BeerLambert,
        StageId::ColorRebalance,
        StageId::Clahe,
        StageId::MultiscaleFusion,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StageId::WhiteBalance => "white_balance",
            StageId::Udcp => "udcp",
            StageId::BeerLambert => "beer_lambert",
            StageId::ColorRebalance => "color_rebalance",
            StageId::Clahe => "clahe",
            StageId::MultiscaleFusion => "multiscale_fusion",
        }
    }

    /// Stable progress message key for this stage.
    pub fn progress_key(self) -> &'static str {
        match self {
            StageId::WhiteBalance => "stage.white_balance",
            StageId::Udcp => "stage.udcp",
            StageId::BeerLambert => "stage.beer_lambert",
            StageId::ColorRebalance => "stage.color_rebalance",
            StageId::Clahe => "stage.clahe",
            StageId::MultiscaleFusion => "stage.multiscale_fusion",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        StageId::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-stage settings: processing flag, auto-tune flag, typed parameters.
/// The two flags are independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "P: Deserialize<'de> + Default"))]
pub struct StageConfig<P> {
    pub enabled: bool,
    pub auto_tune: bool,
    pub params: P,
}

impl<P: Default> Default for StageConfig<P> {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_tune: true,
            params: P::default(),
        }
    }
}

/// Complete pipeline configuration. Every stage is always present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub white_balance: StageConfig<WhiteBalanceParams>,
    pub udcp: StageConfig<UdcpParams>,
    pub beer_lambert: StageConfig<BeerLambertParams>,
    pub color_rebalance: StageConfig<ColorRebalanceParams>,
    pub clahe: StageConfig<ClaheParams>,
    pub multiscale_fusion: StageConfig<FusionParams>,
}

impl PipelineConfig {
    pub fn is_enabled(&self, stage: StageId) -> bool {
        match stage {
            StageId::WhiteBalance => self.white_balance.enabled,
            StageId::Udcp => self.udcp.enabled,
            StageId::BeerLambert => self.beer_lambert.enabled,
            StageId::ColorRebalance => self.color_rebalance.enabled,
            StageId::Clahe => self.clahe.enabled,
            StageId::MultiscaleFusion => self.multiscale_fusion.enabled,
        }
    }

    pub fn set_enabled(&mut self, stage: StageId, enabled: bool) {
        match stage {
            StageId::WhiteBalance => self.white_balance.enabled = enabled,
            StageId::Udcp => self.udcp.enabled = enabled,
            StageId::BeerLambert => self.beer_lambert.enabled = enabled,
            StageId::ColorRebalance => self.color_rebalance.enabled = enabled,
            StageId::Clahe => self.clahe.enabled = enabled,
            StageId::MultiscaleFusion => self.multiscale_fusion.enabled = enabled,
        }
    }

    pub fn is_auto_tune(&self, stage: StageId) -> bool {
        match stage {
            StageId::WhiteBalance => self.white_balance.auto_tune,
            StageId::Udcp => self.udcp.auto_tune,
            StageId::BeerLambert => self.beer_lambert.auto_tune,
            StageId::ColorRebalance => self.color_rebalance.auto_tune,
            StageId::Clahe => self.clahe.auto_tune,
            StageId::MultiscaleFusion => self.multiscale_fusion.auto_tune,
        }
    }

    pub fn set_auto_tune(&mut self, stage: StageId, auto_tune: bool) {
        match stage {
            StageId::WhiteBalance => self.white_balance.auto_tune = auto_tune,
            StageId::Udcp => self.udcp.auto_tune = auto_tune,
            StageId::BeerLambert => self.beer_lambert.auto_tune = auto_tune,
            StageId::ColorRebalance => self.color_rebalance.auto_tune = auto_tune,
            StageId::Clahe => self.clahe.auto_tune = auto_tune,
            StageId::MultiscaleFusion => self.multiscale_fusion.auto_tune = auto_tune,
        }
    }

    /// Set a parameter by name, coercing and clamping the value.
    /// Fails with `InvalidParameter` for unknown names or unsalvageable values.
    pub fn set_parameter(
        &mut self,
        stage: StageId,
        name: &str,
        value: &ParameterValue,
    ) -> Result<()> {
        let result = match stage {
            StageId::WhiteBalance => self.white_balance.params.set_field(name, value),
            StageId::Udcp => self.udcp.params.set_field(name, value),
            StageId::BeerLambert => self.beer_lambert.params.set_field(name, value),
            StageId::ColorRebalance => self.color_rebalance.params.set_field(name, value),
            StageId::Clahe => self.clahe.params.set_field(name, value),
            StageId::MultiscaleFusion => self.multiscale_fusion.params.set_field(name, value),
        };
        result.map_err(|reason| ProcessError::InvalidParameter {
            stage,
            name: name.to_string(),
            reason,
        })
    }

    /// Read a parameter by name, if declared for the stage.
    pub fn get_parameter(&self, stage: StageId, name: &str) -> Option<ParameterValue> {
        match stage {
            StageId::WhiteBalance => self.white_balance.params.get_field(name),
            StageId::Udcp => self.udcp.params.get_field(name),
            StageId::BeerLambert => self.beer_lambert.params.get_field(name),
            StageId::ColorRebalance => self.color_rebalance.params.get_field(name),
            StageId::Clahe => self.clahe.params.get_field(name),
            StageId::MultiscaleFusion => self.multiscale_fusion.params.get_field(name),
        }
    }

    /// Declared parameters of a stage, for UI generation.
    pub fn descriptors(stage: StageId) -> &'static [ParamDescriptor] {
        match stage {
            StageId::WhiteBalance => WhiteBalanceParams::descriptors(),
            StageId::Udcp => UdcpParams::descriptors(),
            StageId::BeerLambert => BeerLambertParams::descriptors(),
            StageId::ColorRebalance => ColorRebalanceParams::descriptors(),
            StageId::Clahe => ClaheParams::descriptors(),
            StageId::MultiscaleFusion => FusionParams::descriptors(),
        }
    }

    /// Reset one stage's parameters to defaults, keeping its flags.
    pub fn reset_stage(&mut self, stage: StageId) {
        match stage {
            StageId::WhiteBalance => self.white_balance.params = WhiteBalanceParams::default(),
            StageId::Udcp => self.udcp.params = UdcpParams::default(),
            StageId::BeerLambert => self.beer_lambert.params = BeerLambertParams::default(),
            StageId::ColorRebalance => {
                self.color_rebalance.params = ColorRebalanceParams::default()
            }
            StageId::Clahe => self.clahe.params = ClaheParams::default(),
            StageId::MultiscaleFusion => self.multiscale_fusion.params = FusionParams::default(),
        }
    }

    /// Clamp every parameter into its declared bounds. Runs after
    /// deserialization and after auto-tune writes.
    pub fn clamp_all(&mut self) {
        self.white_balance.params.clamp_to_bounds();
        self.udcp.params.clamp_to_bounds();
        self.beer_lambert.params.clamp_to_bounds();
        self.color_rebalance.params.clamp_to_bounds();
        self.clahe.params.clamp_to_bounds();
        self.multiscale_fusion.params.clamp_to_bounds();
    }

    /// Deterministic hash of all enabled flags and parameter values.
    ///
    /// Auto-tune flags are excluded: they select how parameters get written,
    /// not what the pipeline computes. Every cached artifact stores the
    /// fingerprint it was produced under, and every read compares it.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        let mut h = FingerprintBuilder::new();

        h.push_bool(self.white_balance.enabled);
        let wb = &self.white_balance.params;
        h.push_str(wb.method.key());
        h.push_f32(wb.percentile);
        h.push_f32(wb.max_gain);
        h.push_f32(wb.green_reduction);
        h.push_f32(wb.magenta_strength);
        h.push_f32(wb.gray_world_influence);

        h.push_bool(self.udcp.enabled);
        let udcp = &self.udcp.params;
        h.push_f32(udcp.omega);
        h.push_f32(udcp.t0);
        h.push_u32(udcp.window);
        h.push_u32(udcp.guided_radius);
        h.push_f32(udcp.guided_eps);
        h.push_f32(udcp.post_contrast_gain);

        h.push_bool(self.beer_lambert.enabled);
        let bl = &self.beer_lambert.params;
        h.push_f32(bl.depth_factor);
        h.push_f32(bl.k_red);
        h.push_f32(bl.k_green);
        h.push_f32(bl.k_blue);
        h.push_f32(bl.enhancement);

        h.push_bool(self.color_rebalance.enabled);
        let cr = &self.color_rebalance.params;
        for row in &cr.matrix {
            for &v in row {
                h.push_f32(v);
            }
        }
        h.push_f32(cr.saturation_limit);
        h.push_bool(cr.preserve_luminance);

        h.push_bool(self.clahe.enabled);
        let clahe = &self.clahe.params;
        h.push_f32(clahe.clip_limit);
        h.push_u32(clahe.tile_grid);

        h.push_bool(self.multiscale_fusion.enabled);
        let fusion = &self.multiscale_fusion.params;
        h.push_u32(fusion.levels);
        h.push_f32(fusion.base_sigma);
        h.push_f32(fusion.scale_factor);
        h.push_f32(fusion.contrast_weight);
        h.push_f32(fusion.saturation_weight);
        h.push_f32(fusion.exposedness_weight);
        h.push_f32(fusion.sharpen_amount);

        ConfigFingerprint(h.finish())
    }
}

/// Compact cache key for a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigFingerprint(u64);

struct FingerprintBuilder(DefaultHasher);

impl FingerprintBuilder {
    fn new() -> Self {
        Self(DefaultHasher::new())
    }

    fn push_bool(&mut self, v: bool) {
        self.0.write_u8(v as u8);
    }

    fn push_u32(&mut self, v: u32) {
        self.0.write_u32(v);
    }

    fn push_f32(&mut self, v: f32) {
        // Bit pattern, so -0.0 and 0.0 fingerprint differently but every
        // value maps deterministically.
        self.0.write_u32(v.to_bits());
    }

    fn push_str(&mut self, v: &str) {
        self.0.write(v.as_bytes());
        self.0.write_u8(0xff);
    }

    fn finish(&self) -> u64 {
        self.0.finish()
    }
}
