//! Per-stage typed parameter records.
//!
//! Every record declares `{min, max, default}` bounds; values are clamped on
//! every write path (`clamp_to_bounds` runs after deserialization, auto-tune,
//! and named sets). Field access by name exists only for the UI-binding
//! boundary and for persistence of unknown hosts.

use serde::{Deserialize, Serialize};

use super::descriptor::{ParamDescriptor, ParameterValue};

/// White balance method selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WbMethod {
    GrayWorld,
    WhitePatch,
    ShadesOfGray,
    GreyEdge,
    LakeGreenWater,
}

impl WbMethod {
    pub const CHOICES: &'static [&'static str] = &[
        "gray_world",
        "white_patch",
        "shades_of_gray",
        "grey_edge",
        "lake_green_water",
    ];

    pub fn key(self) -> &'static str {
        match self {
            WbMethod::GrayWorld => "gray_world",
            WbMethod::WhitePatch => "white_patch",
            WbMethod::ShadesOfGray => "shades_of_gray",
            WbMethod::GreyEdge => "grey_edge",
            WbMethod::LakeGreenWater => "lake_green_water",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "gray_world" => Some(WbMethod::GrayWorld),
            "white_patch" => Some(WbMethod::WhitePatch),
            "shades_of_gray" => Some(WbMethod::ShadesOfGray),
            "grey_edge" => Some(WbMethod::GreyEdge),
            "lake_green_water" => Some(WbMethod::LakeGreenWater),
            _ => None,
        }
    }
}

/// White balance stage parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteBalanceParams {
    pub method: WbMethod,

    /// Percentile band used for robust channel means (1-99).
    pub percentile: f32,

    /// Per-channel gain clamp (1.0-5.0).
    pub max_gain: f32,

    /// Adaptive green reduction for the lake method (0.0-1.0).
    pub green_reduction: f32,

    /// Magenta compensation strength for the lake method (0.0-0.5).
    pub magenta_strength: f32,

    /// Blend of gray-world gains into the lake method (0.0-1.0).
    pub gray_world_influence: f32,
}

impl Default for WhiteBalanceParams {
    fn default() -> Self {
        Self {
            method: WbMethod::GrayWorld,
            percentile: 15.0,
            max_gain: 2.0,
            green_reduction: 0.4,
            magenta_strength: 0.15,
            gray_world_influence: 0.7,
        }
    }
}

impl WhiteBalanceParams {
    pub fn clamp_to_bounds(&mut self) {
        self.percentile = self.percentile.clamp(1.0, 99.0);
        self.max_gain = self.max_gain.clamp(1.0, 5.0);
        self.green_reduction = self.green_reduction.clamp(0.0, 1.0);
        self.magenta_strength = self.magenta_strength.clamp(0.0, 0.5);
        self.gray_world_influence = self.gray_world_influence.clamp(0.0, 1.0);
    }

    pub fn descriptors() -> &'static [ParamDescriptor] {
        const DESCRIPTORS: &[ParamDescriptor] = &[
            ParamDescriptor::choice("method", WbMethod::CHOICES),
            ParamDescriptor::float("percentile", 1.0, 99.0),
            ParamDescriptor::float("max_gain", 1.0, 5.0),
            ParamDescriptor::float("green_reduction", 0.0, 1.0),
            ParamDescriptor::float("magenta_strength", 0.0, 0.5),
            ParamDescriptor::float("gray_world_influence", 0.0, 1.0),
        ];
        DESCRIPTORS
    }

    pub fn set_field(&mut self, name: &str, value: &ParameterValue) -> Result<(), String> {
        match name {
            "method" => {
                let key = value.as_enum().ok_or("expected enum value")?;
                self.method =
                    WbMethod::from_key(key).ok_or_else(|| format!("unknown method '{}'", key))?;
            }
            "percentile" => self.percentile = value.as_f32().ok_or("expected number")?,
            "max_gain" => self.max_gain = value.as_f32().ok_or("expected number")?,
            "green_reduction" => self.green_reduction = value.as_f32().ok_or("expected number")?,
            "magenta_strength" => {
                self.magenta_strength = value.as_f32().ok_or("expected number")?
            }
            "gray_world_influence" => {
                self.gray_world_influence = value.as_f32().ok_or("expected number")?
            }
            _ => return Err(format!("unknown parameter '{}'", name)),
        }
        self.clamp_to_bounds();
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "method" => Some(ParameterValue::Enum(self.method.key().to_string())),
            "percentile" => Some(ParameterValue::Float(self.percentile)),
            "max_gain" => Some(ParameterValue::Float(self.max_gain)),
            "green_reduction" => Some(ParameterValue::Float(self.green_reduction)),
            "magenta_strength" => Some(ParameterValue::Float(self.magenta_strength)),
            "gray_world_influence" => Some(ParameterValue::Float(self.gray_world_influence)),
            _ => None,
        }
    }
}

/// Underwater dark channel prior parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdcpParams {
    /// Fraction of estimated haze to remove (0.5-0.99).
    pub omega: f32,

    /// Transmission floor (0.05-0.3).
    pub t0: f32,

    /// Dark channel window side, odd (5-31).
    pub window: u32,

    /// Guided filter radius in pixels (10-200).
    pub guided_radius: u32,

    /// Guided filter regularization (1e-4 - 1e-2).
    pub guided_eps: f32,

    /// Linear contrast stretch around 0.5 after recovery (1.0-2.0).
    pub post_contrast_gain: f32,
}

impl Default for UdcpParams {
    fn default() -> Self {
        Self {
            omega: 0.95,
            t0: 0.1,
            window: 11,
            guided_radius: 60,
            guided_eps: 1e-3,
            post_contrast_gain: 1.2,
        }
    }
}

impl UdcpParams {
    pub fn clamp_to_bounds(&mut self) {
        self.omega = self.omega.clamp(0.5, 0.99);
        self.t0 = self.t0.clamp(0.05, 0.3);
        self.window = self.window.clamp(5, 31) | 1;
        self.guided_radius = self.guided_radius.clamp(10, 200);
        self.guided_eps = self.guided_eps.clamp(1e-4, 1e-2);
        self.post_contrast_gain = self.post_contrast_gain.clamp(1.0, 2.0);
    }

    pub fn descriptors() -> &'static [ParamDescriptor] {
        const DESCRIPTORS: &[ParamDescriptor] = &[
            ParamDescriptor::float("omega", 0.5, 0.99),
            ParamDescriptor::float("t0", 0.05, 0.3),
            ParamDescriptor::int("window", 5.0, 31.0),
            ParamDescriptor::int("guided_radius", 10.0, 200.0),
            ParamDescriptor::float("guided_eps", 1e-4, 1e-2),
            ParamDescriptor::float("post_contrast_gain", 1.0, 2.0),
        ];
        DESCRIPTORS
    }

    pub fn set_field(&mut self, name: &str, value: &ParameterValue) -> Result<(), String> {
        match name {
            "omega" => self.omega = value.as_f32().ok_or("expected number")?,
            "t0" => self.t0 = value.as_f32().ok_or("expected number")?,
            "window" => self.window = value.as_i64().ok_or("expected integer")?.max(0) as u32,
            "guided_radius" => {
                self.guided_radius = value.as_i64().ok_or("expected integer")?.max(0) as u32
            }
            "guided_eps" => self.guided_eps = value.as_f32().ok_or("expected number")?,
            "post_contrast_gain" => {
                self.post_contrast_gain = value.as_f32().ok_or("expected number")?
            }
            _ => return Err(format!("unknown parameter '{}'", name)),
        }
        self.clamp_to_bounds();
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "omega" => Some(ParameterValue::Float(self.omega)),
            "t0" => Some(ParameterValue::Float(self.t0)),
            "window" => Some(ParameterValue::Int(self.window as i64)),
            "guided_radius" => Some(ParameterValue::Int(self.guided_radius as i64)),
            "guided_eps" => Some(ParameterValue::Float(self.guided_eps)),
            "post_contrast_gain" => Some(ParameterValue::Float(self.post_contrast_gain)),
            _ => None,
        }
    }
}

/// Beer-Lambert attenuation compensation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeerLambertParams {
    /// Depth proxy scale (0.01-1.2).
    pub depth_factor: f32,

    /// Red attenuation coefficient (0.05-2.0).
    pub k_red: f32,

    /// Green attenuation coefficient (0.05-1.5).
    pub k_green: f32,

    /// Blue attenuation coefficient (0.05-1.0).
    pub k_blue: f32,

    /// Global compensation multiplier (1.0-3.0).
    pub enhancement: f32,
}

impl Default for BeerLambertParams {
    fn default() -> Self {
        Self {
            depth_factor: 0.15,
            k_red: 0.6,
            k_green: 0.3,
            k_blue: 0.1,
            enhancement: 1.5,
        }
    }
}

impl BeerLambertParams {
    pub fn clamp_to_bounds(&mut self) {
        self.depth_factor = self.depth_factor.clamp(0.01, 1.2);
        self.k_red = self.k_red.clamp(0.05, 2.0);
        self.k_green = self.k_green.clamp(0.05, 1.5);
        self.k_blue = self.k_blue.clamp(0.05, 1.0);
        self.enhancement = self.enhancement.clamp(1.0, 3.0);
    }

    pub fn descriptors() -> &'static [ParamDescriptor] {
        const DESCRIPTORS: &[ParamDescriptor] = &[
            ParamDescriptor::float("depth_factor", 0.01, 1.2),
            ParamDescriptor::float("k_red", 0.05, 2.0),
            ParamDescriptor::float("k_green", 0.05, 1.5),
            ParamDescriptor::float("k_blue", 0.05, 1.0),
            ParamDescriptor::float("enhancement", 1.0, 3.0),
        ];
        DESCRIPTORS
    }

    pub fn set_field(&mut self, name: &str, value: &ParameterValue) -> Result<(), String> {
        match name {
            "depth_factor" => self.depth_factor = value.as_f32().ok_or("expected number")?,
            "k_red" => self.k_red = value.as_f32().ok_or("expected number")?,
            "k_green" => self.k_green = value.as_f32().ok_or("expected number")?,
            "k_blue" => self.k_blue = value.as_f32().ok_or("expected number")?,
            "enhancement" => self.enhancement = value.as_f32().ok_or("expected number")?,
            _ => return Err(format!("unknown parameter '{}'", name)),
        }
        self.clamp_to_bounds();
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "depth_factor" => Some(ParameterValue::Float(self.depth_factor)),
            "k_red" => Some(ParameterValue::Float(self.k_red)),
            "k_green" => Some(ParameterValue::Float(self.k_green)),
            "k_blue" => Some(ParameterValue::Float(self.k_blue)),
            "enhancement" => Some(ParameterValue::Float(self.enhancement)),
            _ => None,
        }
    }
}

/// Color rebalance parameters: a 3x3 mixing matrix plus saturation guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRebalanceParams {
    /// Row-major output-from-input mixing matrix; identity by default.
    pub matrix: [[f32; 3]; 3],

    /// Saturation ceiling inside the magenta hue band (0.3-1.0).
    pub saturation_limit: f32,

    /// Rescale output so per-pixel LAB lightness matches the input.
    pub preserve_luminance: bool,
}

impl Default for ColorRebalanceParams {
    fn default() -> Self {
        Self {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            saturation_limit: 0.8,
            preserve_luminance: false,
        }
    }
}

/// Matrix entry names in row-major order, matching the descriptor table.
const MATRIX_FIELDS: [[&str; 3]; 3] = [
    ["rr", "rg", "rb"],
    ["gr", "gg", "gb"],
    ["br", "bg", "bb"],
];

impl ColorRebalanceParams {
    pub fn clamp_to_bounds(&mut self) {
        for (i, row) in self.matrix.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = if i == j {
                    v.clamp(0.5, 2.0)
                } else {
                    v.clamp(-0.5, 0.5)
                };
            }
        }
        self.saturation_limit = self.saturation_limit.clamp(0.3, 1.0);
    }

    pub fn descriptors() -> &'static [ParamDescriptor] {
        const DESCRIPTORS: &[ParamDescriptor] = &[
            ParamDescriptor::float("rr", 0.5, 2.0),
            ParamDescriptor::float("rg", -0.5, 0.5),
            ParamDescriptor::float("rb", -0.5, 0.5),
            ParamDescriptor::float("gr", -0.5, 0.5),
            ParamDescriptor::float("gg", 0.5, 2.0),
            ParamDescriptor::float("gb", -0.5, 0.5),
            ParamDescriptor::float("br", -0.5, 0.5),
            ParamDescriptor::float("bg", -0.5, 0.5),
            ParamDescriptor::float("bb", 0.5, 2.0),
            ParamDescriptor::float("saturation_limit", 0.3, 1.0),
            ParamDescriptor::bool("preserve_luminance"),
        ];
        DESCRIPTORS
    }

    pub fn set_field(&mut self, name: &str, value: &ParameterValue) -> Result<(), String> {
        if name == "saturation_limit" {
            self.saturation_limit = value.as_f32().ok_or("expected number")?;
        } else if name == "preserve_luminance" {
            self.preserve_luminance = value.as_bool().ok_or("expected bool")?;
        } else if let Some((i, j)) = Self::matrix_index(name) {
            self.matrix[i][j] = value.as_f32().ok_or("expected number")?;
        } else {
            return Err(format!("unknown parameter '{}'", name));
        }
        self.clamp_to_bounds();
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<ParameterValue> {
        if name == "saturation_limit" {
            return Some(ParameterValue::Float(self.saturation_limit));
        }
        if name == "preserve_luminance" {
            return Some(ParameterValue::Bool(self.preserve_luminance));
        }
        Self::matrix_index(name).map(|(i, j)| ParameterValue::Float(self.matrix[i][j]))
    }

    fn matrix_index(name: &str) -> Option<(usize, usize)> {
        for (i, row) in MATRIX_FIELDS.iter().enumerate() {
            for (j, field) in row.iter().enumerate() {
                if *field == name {
                    return Some((i, j));
                }
            }
        }
        None
    }
}

/// CLAHE parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheParams {
    /// Histogram clip limit (1.0-10.0).
    pub clip_limit: f32,

    /// Square tile grid side (4-16).
    pub tile_grid: u32,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: 8,
        }
    }
}

impl ClaheParams {
    pub fn clamp_to_bounds(&mut self) {
        self.clip_limit = self.clip_limit.clamp(1.0, 10.0);
        self.tile_grid = self.tile_grid.clamp(4, 16);
    }

    pub fn descriptors() -> &'static [ParamDescriptor] {
        const DESCRIPTORS: &[ParamDescriptor] = &[
            ParamDescriptor::float("clip_limit", 1.0, 10.0),
            ParamDescriptor::int("tile_grid", 4.0, 16.0),
        ];
        DESCRIPTORS
    }

    pub fn set_field(&mut self, name: &str, value: &ParameterValue) -> Result<(), String> {
        match name {
            "clip_limit" => self.clip_limit = value.as_f32().ok_or("expected number")?,
            "tile_grid" => {
                self.tile_grid = value.as_i64().ok_or("expected integer")?.max(0) as u32
            }
            _ => return Err(format!("unknown parameter '{}'", name)),
        }
        self.clamp_to_bounds();
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "clip_limit" => Some(ParameterValue::Float(self.clip_limit)),
            "tile_grid" => Some(ParameterValue::Int(self.tile_grid as i64)),
            _ => None,
        }
    }
}

/// Multi-scale fusion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionParams {
    /// Pyramid levels (2-6).
    pub levels: u32,

    /// Gaussian sigma for pyramid smoothing and the sharpen variant (0.3-2.0).
    pub base_sigma: f32,

    /// Per-level shrink ratio (1.2-3.0).
    pub scale_factor: f32,

    /// Contrast weight exponent (0.0-2.0).
    pub contrast_weight: f32,

    /// Saturation weight exponent (0.0-2.0).
    pub saturation_weight: f32,

    /// Exposedness weight exponent (0.0-2.0).
    pub exposedness_weight: f32,

    /// Unsharp mask amount for the sharpened variant (0.0-1.0).
    pub sharpen_amount: f32,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            levels: 3,
            base_sigma: 1.0,
            scale_factor: 2.0,
            contrast_weight: 1.0,
            saturation_weight: 1.0,
            exposedness_weight: 1.0,
            sharpen_amount: 0.3,
        }
    }
}

impl FusionParams {
    pub fn clamp_to_bounds(&mut self) {
        self.levels = self.levels.clamp(2, 6);
        self.base_sigma = self.base_sigma.clamp(0.3, 2.0);
        self.scale_factor = self.scale_factor.clamp(1.2, 3.0);
        self.contrast_weight = self.contrast_weight.clamp(0.0, 2.0);
        self.saturation_weight = self.saturation_weight.clamp(0.0, 2.0);
        self.exposedness_weight = self.exposedness_weight.clamp(0.0, 2.0);
        self.sharpen_amount = self.sharpen_amount.clamp(0.0, 1.0);
    }

    pub fn descriptors() -> &'static [ParamDescriptor] {
        const DESCRIPTORS: &[ParamDescriptor] = &[
            ParamDescriptor::int("levels", 2.0, 6.0),
            ParamDescriptor::float("base_sigma", 0.3, 2.0),
            ParamDescriptor::float("scale_factor", 1.2, 3.0),
            ParamDescriptor::float("contrast_weight", 0.0, 2.0),
            ParamDescriptor::float("saturation_weight", 0.0, 2.0),
            ParamDescriptor::float("exposedness_weight", 0.0, 2.0),
            ParamDescriptor::float("sharpen_amount", 0.0, 1.0),
        ];
        DESCRIPTORS
    }

    pub fn set_field(&mut self, name: &str, value: &ParameterValue) -> Result<(), String> {
        match name {
            "levels" => self.levels = value.as_i64().ok_or("expected integer")?.max(0) as u32,
            "base_sigma" => self.base_sigma = value.as_f32().ok_or("expected number")?,
            "scale_factor" => self.scale_factor = value.as_f32().ok_or("expected number")?,
            "contrast_weight" => self.contrast_weight = value.as_f32().ok_or("expected number")?,
            "saturation_weight" => {
                self.saturation_weight = value.as_f32().ok_or("expected number")?
            }
            "exposedness_weight" => {
                self.exposedness_weight = value.as_f32().ok_or("expected number")?
            }
            "sharpen_amount" => self.sharpen_amount = value.as_f32().ok_or("expected number")?,
            _ => return Err(format!("unknown parameter '{}'", name)),
        }
        self.clamp_to_bounds();
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<ParameterValue> {
        match name {
            "levels" => Some(ParameterValue::Int(self.levels as i64)),
            "base_sigma" => Some(ParameterValue::Float(self.base_sigma)),
            "scale_factor" => Some(ParameterValue::Float(self.scale_factor)),
            "contrast_weight" => Some(ParameterValue::Float(self.contrast_weight)),
            "saturation_weight" => Some(ParameterValue::Float(self.saturation_weight)),
            "exposedness_weight" => Some(ParameterValue::Float(self.exposedness_weight)),
            "sharpen_amount" => Some(ParameterValue::Float(self.sharpen_amount)),
            _ => None,
        }
    }
}
