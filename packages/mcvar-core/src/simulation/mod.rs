//! Correlated geometric Brownian motion simulation.
//!
//! Scenarios are split into fixed-size blocks that run in parallel. Each block
//! draws from its own random stream, so results do not depend on the number of
//! worker threads.

mod cancel;
mod engine;
mod paths;
mod rng;

pub use cancel::CancellationToken;
pub use engine::{SimulationEngine, SimulationOutput};
pub use paths::{PortfolioValuePath, PricePathTensor};
pub use rng::RandomSource;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of scenarios simulated per parallel block.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Shape of a simulation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationParams {
    /// Number of simulated trading days, including the fixed day 0
    pub horizon_days: usize,
    /// Number of independent scenarios
    pub scenarios: usize,
    /// Scenarios per parallel block
    pub block_size: usize,
}

impl SimulationParams {
    /// Create parameters with the default block size.
    pub fn new(horizon_days: usize, scenarios: usize) -> Self {
        Self {
            horizon_days,
            scenarios,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Override the block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Check horizon, scenario count and block size are at least 1.
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days < 1 {
            return Err(Error::InvalidParameter(
                "Horizon must be at least 1 trading day".to_string(),
            ));
        }
        if self.scenarios < 1 {
            return Err(Error::InvalidParameter(
                "Scenario count must be at least 1".to_string(),
            ));
        }
        if self.block_size < 1 {
            return Err(Error::InvalidParameter(
                "Block size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of scenario blocks.
    pub fn block_count(&self) -> usize {
        self.scenarios.div_ceil(self.block_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validate() {
        assert!(SimulationParams::new(1, 1).validate().is_ok());
        assert!(matches!(
            SimulationParams::new(0, 10).validate(),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            SimulationParams::new(10, 0).validate(),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            SimulationParams::new(10, 10).with_block_size(0).validate(),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_block_count() {
        assert_eq!(SimulationParams::new(5, 5000).block_count(), 5);
        assert_eq!(SimulationParams::new(5, 1024).block_count(), 1);
        assert_eq!(SimulationParams::new(5, 10).with_block_size(3).block_count(), 4);
    }
}
