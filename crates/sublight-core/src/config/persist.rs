//! Configuration and preset persistence (versioned UTF-8 JSON).
//!
//! Unknown keys are ignored, missing keys inherit defaults, and a version
//! mismatch is a non-fatal warning. Atomic write-to-temp-then-rename is the
//! caller's responsibility.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, Result};

use super::PipelineConfig;

/// Current on-disk format version.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedConfig {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    stages: PipelineConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Serialize a configuration to the persisted JSON format.
pub fn config_to_json(config: &PipelineConfig) -> Result<String> {
    let persisted = PersistedConfig {
        version: CONFIG_VERSION,
        stages: config.clone(),
    };
    Ok(serde_json::to_string_pretty(&persisted)?)
}

/// Parse a configuration from the persisted JSON format.
///
/// Returns the parsed configuration (clamped to declared bounds) plus any
/// non-fatal warnings.
pub fn config_from_json(json: &str) -> Result<(PipelineConfig, Vec<String>)> {
    let mut warnings = Vec::new();
    let persisted: PersistedConfig = serde_json::from_str(json)?;
    if persisted.version != CONFIG_VERSION {
        warnings.push(format!(
            "config version {} does not match expected {}; loading with defaults for unknown fields",
            persisted.version, CONFIG_VERSION
        ));
    }
    let mut config = persisted.stages;
    config.clamp_all();
    Ok((config, warnings))
}

/// Write a configuration file.
pub fn save_config<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> Result<()> {
    let json = config_to_json(config)?;
    std::fs::write(path.as_ref(), json)?;
    Ok(())
}

/// Read a configuration file, returning the config and non-fatal warnings.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<(PipelineConfig, Vec<String>)> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    config_from_json(&contents)
}

/// Validate a preset name to prevent path traversal.
/// Rejects path separators, "..", leading dots, and NUL bytes.
pub fn validate_preset_name(name: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(ProcessError::InvalidInput(format!(
            "preset name '{}': {}",
            name, reason
        )))
    };

    if name.is_empty() {
        return reject("cannot be empty");
    }
    if name.contains('/') || name.contains('\\') {
        return reject("cannot contain path separators");
    }
    if name.contains("..") {
        return reject("cannot contain '..'");
    }
    if name.starts_with('.') {
        return reject("cannot start with '.'");
    }
    if name.contains('\0') {
        return reject("cannot contain null bytes");
    }
    Ok(())
}

/// Save a named preset into a directory as `<name>.json`.
pub fn save_preset<P: AsRef<Path>>(config: &PipelineConfig, dir: P, name: &str) -> Result<()> {
    validate_preset_name(name)?;
    let path = dir.as_ref().join(format!("{}.json", name));
    save_config(config, path)
}

/// Load a named preset from a directory.
pub fn load_preset<P: AsRef<Path>>(dir: P, name: &str) -> Result<(PipelineConfig, Vec<String>)> {
    validate_preset_name(name)?;
    let path = dir.as_ref().join(format!("{}.json", name));
    load_config(path)
}

/// List preset names (file stems of `.json` files) in a directory.
pub fn list_presets<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
    let mut presets = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                presets.push(name.to_string());
            }
        }
    }
    presets.sort();
    Ok(presets)
}
