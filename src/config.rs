//! Model configuration
//!
//! Loaded from TOML. Every section is optional and falls back to the
//! standard five-year startup assumptions.
//!
//! ```toml
//! horizon = 5
//!
//! [[schedule]]
//! growth_rate = 0.35
//! margin_delta = 0.02
//!
//! [ratios]
//! depreciation = 0.025
//!
//! [data]
//! dir = "data"
//! ```

use crate::dcf::SensitivityConfig;
use crate::error::{Result, ValuationError};
use crate::projection::{AssumptionSchedule, OperatingRatios};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const HISTORICAL_FILE: &str = "startup_financials.csv";
pub const COMPARABLES_FILE: &str = "comparable_companies.csv";
pub const PARAMETERS_FILE: &str = "valuation_parameters.csv";

/// Locations of the three input tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub dir: PathBuf,
    pub historical: String,
    pub comparables: String,
    pub parameters: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            historical: HISTORICAL_FILE.to_string(),
            comparables: COMPARABLES_FILE.to_string(),
            parameters: PARAMETERS_FILE.to_string(),
        }
    }
}

impl DataPaths {
    /// Default file names inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn historical_path(&self) -> PathBuf {
        self.dir.join(&self.historical)
    }

    pub fn comparables_path(&self) -> PathBuf {
        self.dir.join(&self.comparables)
    }

    pub fn parameters_path(&self) -> PathBuf {
        self.dir.join(&self.parameters)
    }
}

/// Full model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Forecast years
    pub horizon: usize,
    pub schedule: AssumptionSchedule,
    pub ratios: OperatingRatios,
    pub sensitivity: SensitivityConfig,
    pub data: DataPaths,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            horizon: 5,
            schedule: AssumptionSchedule::default(),
            ratios: OperatingRatios::default(),
            sensitivity: SensitivityConfig::default(),
            data: DataPaths::default(),
        }
    }
}

impl ModelConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ModelConfig = toml::from_str(contents)
            .map_err(|e| ValuationError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or from `~/.startup-valuation/config.toml`
    /// when present, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(config_path) => {
                if !config_path.exists() {
                    return Err(ValuationError::MissingInput(format!(
                        "config file {}",
                        config_path.display()
                    )));
                }
                let contents = fs::read_to_string(config_path)?;
                Self::from_toml_str(&contents)
            }
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => {
                    log::debug!("Loading config from {}", default_path.display());
                    let contents = fs::read_to_string(&default_path)?;
                    Self::from_toml_str(&contents)
                }
                _ => Ok(Self::default()),
            },
        }
    }

    /// Check the horizon against the schedule and the sensitivity ranges
    pub fn validate(&self) -> Result<()> {
        self.schedule.for_horizon(self.horizon)?;
        self.sensitivity.validate()?;
        Ok(())
    }
}

/// `~/.startup-valuation/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".startup-valuation").join("config.toml"))
}
