//! Run configuration and its JSON persistence.

use crate::risk::DEFAULT_CONFIDENCE;
use crate::simulation::{RandomSource, SimulationParams, DEFAULT_BLOCK_SIZE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the default config file location.
pub const CONFIG_FILE_ENV: &str = "MCVAR_CONFIG_FILE";

/// Everything needed to run the risk pipeline besides the price history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Tickers to simulate, in weight order
    pub tickers: Vec<String>,
    /// Allocation weight per ticker (not normalized)
    pub weights: Vec<f64>,
    /// Portfolio value at day 0
    pub initial_value: f64,
    /// Simulated trading days, including day 0
    pub horizon_days: usize,
    /// Number of Monte Carlo scenarios
    pub scenarios: usize,
    /// Confidence level for VaR/CVaR
    pub confidence: f64,
    /// Root random seed; `null` draws one from the OS
    pub seed: Option<u64>,
    /// Scenarios per parallel block
    pub block_size: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            tickers: vec!["THYAO.IS".to_string(), "ASELS.IS".to_string()],
            weights: vec![0.60, 0.40],
            initial_value: 100_000.0,
            horizon_days: 252,
            scenarios: 5_000,
            confidence: DEFAULT_CONFIDENCE,
            seed: Some(42),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl RiskConfig {
    /// Get the default config file path.
    ///
    /// Default path: `~/.mcvar/config.json`
    /// Can be overridden with the `MCVAR_CONFIG_FILE` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_FILE_ENV) {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".mcvar/config.json"))
            .unwrap_or_else(|| PathBuf::from("mcvar.json"))
    }

    /// Load a config from a JSON file. Missing fields take their default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        debug!(path = %path.as_ref().display(), "config loaded");
        Ok(config)
    }

    /// Load from the default path, falling back to defaults when no file exists.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check shapes and ranges before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.tickers.is_empty() {
            return Err(Error::Dimension("No tickers configured".to_string()));
        }
        if self.weights.len() != self.tickers.len() {
            return Err(Error::Dimension(format!(
                "{} weights for {} tickers",
                self.weights.len(),
                self.tickers.len()
            )));
        }
        if !(self.initial_value.is_finite() && self.initial_value > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "Initial value must be positive, got {}",
                self.initial_value
            )));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "Confidence level must be in (0, 1), got {}",
                self.confidence
            )));
        }
        self.simulation_params().validate()
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams::new(self.horizon_days, self.scenarios).with_block_size(self.block_size)
    }

    /// Seeded source when a seed is configured, otherwise an entropy-seeded one.
    pub fn random_source(&self) -> RandomSource {
        self.seed
            .map(RandomSource::from_seed)
            .unwrap_or_else(RandomSource::from_entropy)
    }
}
