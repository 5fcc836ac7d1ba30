//! Pipeline settings: defaults, optional YAML file, environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bands::DEFAULT_SCALE_FACTOR;
use crate::error::{IndexError, Result};
use crate::naming::{NamingConvention, DEFAULT_BAND_PATTERN, DEFAULT_TIMEFRAME_PATTERN};

/// File naming patterns, see [`NamingConvention`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingSettings {
    pub band_pattern: String,
    pub timeframe_pattern: String,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            band_pattern: DEFAULT_BAND_PATTERN.to_string(),
            timeframe_pattern: DEFAULT_TIMEFRAME_PATTERN.to_string(),
        }
    }
}

/// Settings shared by both pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub naming: NamingSettings,

    /// Divisor applied to digital numbers when loading bands.
    pub scale_factor: f32,

    /// Maximum number of work items in flight.
    pub max_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            naming: NamingSettings::default(),
            scale_factor: DEFAULT_SCALE_FACTOR,
            max_concurrency: num_cpus::get(),
        }
    }
}

impl PipelineSettings {
    /// Defaults, overlaid with `path` if given, then with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let settings = settings.with_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Read a YAML settings file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IndexError::invalid_config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            IndexError::invalid_config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply `INDEX_SCALE_FACTOR`, `INDEX_MAX_CONCURRENCY`,
    /// `INDEX_BAND_PATTERN` and `INDEX_TIMEFRAME_PATTERN`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("INDEX_SCALE_FACTOR") {
            if let Ok(factor) = val.parse() {
                self.scale_factor = factor;
            }
        }

        if let Ok(val) = std::env::var("INDEX_MAX_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                self.max_concurrency = n;
            }
        }

        if let Ok(val) = std::env::var("INDEX_BAND_PATTERN") {
            self.naming.band_pattern = val;
        }

        if let Ok(val) = std::env::var("INDEX_TIMEFRAME_PATTERN") {
            self.naming.timeframe_pattern = val;
        }

        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.scale_factor.is_finite() && self.scale_factor > 0.0) {
            return Err(IndexError::invalid_config("scale_factor must be > 0"));
        }

        if self.max_concurrency == 0 {
            return Err(IndexError::invalid_config("max_concurrency must be > 0"));
        }

        self.naming_convention().map(|_| ())
    }

    pub fn naming_convention(&self) -> Result<NamingConvention> {
        NamingConvention::new(&self.naming.band_pattern, &self.naming.timeframe_pattern)
    }
}
