//! Block-parallel correlated GBM simulation.

use super::{CancellationToken, PortfolioValuePath, PricePathTensor, RandomSource, SimulationParams};
use crate::statistics::SimulationStatistics;
use crate::types::Portfolio;
use crate::{Error, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

/// Simulated paths for every day and scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    /// Portfolio value per (day, scenario)
    pub portfolio_values: PortfolioValuePath,
    /// Asset price per (day, scenario, asset)
    pub price_paths: PricePathTensor,
}

/// Paths produced by one scenario block, in block-local (day, scenario, asset) order.
struct BlockPaths {
    start: usize,
    len: usize,
    values: Vec<f64>,
    prices: Vec<f64>,
}

/// Runs correlated geometric Brownian motion for a buy-and-hold portfolio.
///
/// Each day, an `M x N` matrix of standard normals is right-multiplied by the
/// transpose of the daily Cholesky factor, and every price moves by
/// `exp(drift + shock)`. Portfolio value tracks the weighted price ratio to day 0:
/// `(prices_t . w) / (prices_0 . w) * P0`.
#[derive(Debug)]
pub struct SimulationEngine<'a> {
    portfolio: &'a Portfolio,
    statistics: &'a SimulationStatistics,
    params: SimulationParams,
    /// Transposed daily Cholesky factor, computed once per run
    cholesky_t: DMatrix<f64>,
    basis: f64,
}

impl<'a> SimulationEngine<'a> {
    /// Create an engine after checking shapes and parameters.
    pub fn new(
        portfolio: &'a Portfolio,
        statistics: &'a SimulationStatistics,
        params: SimulationParams,
    ) -> Result<Self> {
        params.validate()?;

        let assets = portfolio.asset_count();
        if statistics.daily_drift.len() != assets {
            return Err(Error::Dimension(format!(
                "Drift has {} entries for {} assets",
                statistics.daily_drift.len(),
                assets
            )));
        }
        if statistics.daily_cholesky.shape() != (assets, assets) {
            return Err(Error::Dimension(format!(
                "Cholesky factor is {}x{} for {} assets",
                statistics.daily_cholesky.nrows(),
                statistics.daily_cholesky.ncols(),
                assets
            )));
        }
        if portfolio
            .initial_prices
            .iter()
            .any(|p| !(p.is_finite() && *p > 0.0))
        {
            return Err(Error::InvalidParameter(
                "Initial prices must be positive".to_string(),
            ));
        }
        if !(portfolio.initial_value.is_finite() && portfolio.initial_value > 0.0) {
            return Err(Error::InvalidParameter(
                "Initial portfolio value must be positive".to_string(),
            ));
        }

        let basis = portfolio.weighted_basis();
        if !basis.is_finite() || basis == 0.0 {
            return Err(Error::InvalidParameter(format!(
                "Weighted day-0 price basis must be non-zero, got {}",
                basis
            )));
        }

        Ok(Self {
            portfolio,
            statistics,
            params,
            cholesky_t: statistics.daily_cholesky.transpose(),
            basis,
        })
    }

    /// Run every scenario block to completion.
    pub fn run(&self, rng: &RandomSource) -> Result<SimulationOutput> {
        self.run_with_cancel(rng, &CancellationToken::new())
    }

    /// Run with a cancellation check between day-steps.
    ///
    /// Returns `Error::Cancelled` rather than a partial result once the token fires.
    #[instrument(skip_all, fields(
        days = self.params.horizon_days,
        scenarios = self.params.scenarios,
        assets = self.portfolio.asset_count(),
        seed = rng.seed(),
    ))]
    pub fn run_with_cancel(
        &self,
        rng: &RandomSource,
        cancel: &CancellationToken,
    ) -> Result<SimulationOutput> {
        let SimulationParams {
            horizon_days: days,
            scenarios,
            block_size,
        } = self.params;
        let assets = self.portfolio.asset_count();

        info!(blocks = self.params.block_count(), block_size, "simulation started");

        let blocks: Vec<(usize, usize)> = (0..scenarios)
            .step_by(block_size)
            .map(|start| (start, block_size.min(scenarios - start)))
            .collect();

        let results = blocks
            .par_iter()
            .enumerate()
            .map(|(block, &(start, len))| self.simulate_block(block, start, len, rng, cancel))
            .collect::<Result<Vec<_>>>()?;

        let mut values = vec![0.0; days * scenarios];
        let mut prices = vec![0.0; days * scenarios * assets];
        for block in &results {
            for day in 0..days {
                let src = day * block.len;
                let dst = day * scenarios + block.start;
                values[dst..dst + block.len].copy_from_slice(&block.values[src..src + block.len]);

                let src = src * assets;
                let dst = dst * assets;
                let width = block.len * assets;
                prices[dst..dst + width].copy_from_slice(&block.prices[src..src + width]);
            }
        }

        let portfolio_values = PortfolioValuePath::from_vec(days, scenarios, values)
            .ok_or_else(|| Error::Simulation("Portfolio value path has wrong length".to_string()))?;
        let price_paths = PricePathTensor::from_vec(days, scenarios, assets, prices)
            .ok_or_else(|| Error::Simulation("Price path tensor has wrong length".to_string()))?;

        info!("simulation finished");

        Ok(SimulationOutput {
            portfolio_values,
            price_paths,
        })
    }

    fn simulate_block(
        &self,
        block: usize,
        start: usize,
        len: usize,
        rng: &RandomSource,
        cancel: &CancellationToken,
    ) -> Result<BlockPaths> {
        let days = self.params.horizon_days;
        let assets = self.portfolio.asset_count();
        let drift = self.statistics.daily_drift.as_slice();
        let weights = &self.portfolio.weights;
        let p0 = self.portfolio.initial_value;

        let mut block_rng = rng.block_rng(block);
        let mut shocks = vec![0.0; len * assets];
        let mut values = vec![0.0; days * len];
        let mut prices = vec![0.0; days * len * assets];

        // Day 0 is fixed for every scenario
        values[..len].fill(p0);
        for row in prices[..len * assets].chunks_exact_mut(assets) {
            row.copy_from_slice(&self.portfolio.initial_prices);
        }

        for day in 1..days {
            if cancel.is_cancelled() {
                debug!(block, day, "cancellation observed");
                return Err(Error::Cancelled);
            }

            RandomSource::fill_standard_normal(&mut block_rng, &mut shocks);
            let z = DMatrix::from_row_slice(len, assets, &shocks);
            let correlated = z * &self.cholesky_t;

            let (done, rest) = prices.split_at_mut(day * len * assets);
            let prev = &done[(day - 1) * len * assets..];
            let curr = &mut rest[..len * assets];

            for s in 0..len {
                let row = s * assets;
                let mut weighted = 0.0;
                for a in 0..assets {
                    let price = prev[row + a] * (drift[a] + correlated[(s, a)]).exp();
                    if !(price.is_finite() && price > 0.0) {
                        return Err(Error::Simulation(format!(
                            "Price of {} left the positive finite range ({}) on day {} \
                             in scenario {}",
                            self.portfolio.tickers[a],
                            price,
                            day,
                            start + s
                        )));
                    }
                    curr[row + a] = price;
                    weighted += price * weights[a];
                }

                let value = weighted / self.basis * p0;
                if !value.is_finite() {
                    return Err(Error::Simulation(format!(
                        "Non-finite portfolio value on day {} in scenario {}",
                        day,
                        start + s
                    )));
                }
                values[day * len + s] = value;
            }
        }

        debug!(block, start, len, "block finished");

        Ok(BlockPaths {
            start,
            len,
            values,
            prices,
        })
    }
}
