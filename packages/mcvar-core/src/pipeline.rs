//! End-to-end risk run: price history to VaR/CVaR.

use crate::config::RiskConfig;
use crate::market::PriceHistory;
use crate::risk::{calculate_risk_metrics, RiskReport};
use crate::simulation::{CancellationToken, SimulationEngine, SimulationOutput};
use crate::statistics::{calculate_statistics, SimulationStatistics};
use crate::types::Portfolio;
use crate::Result;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Validated portfolio with its day-0 prices
    pub portfolio: Portfolio,
    /// Parameters estimated from the price history
    pub statistics: SimulationStatistics,
    /// Simulated price and value paths
    pub simulation: SimulationOutput,
    /// VaR/CVaR and the terminal distribution
    pub report: RiskReport,
    /// Seed the random source was created from
    pub seed: u64,
    pub generated_at: DateTime<Utc>,
}

impl PipelineOutput {
    /// Allocation label, e.g. `60.0% THYAO.IS, 40.0% ASELS.IS`.
    pub fn label(&self) -> String {
        self.portfolio.label()
    }
}

/// Run statistics, simulation and risk metrics for the configured portfolio.
pub fn run_pipeline(history: &PriceHistory, config: &RiskConfig) -> Result<PipelineOutput> {
    run_pipeline_with_cancel(history, config, &CancellationToken::new())
}

/// Same as [`run_pipeline`], stopping with `Error::Cancelled` once `cancel` fires.
#[instrument(skip_all, fields(tickers = ?config.tickers))]
pub fn run_pipeline_with_cancel(
    history: &PriceHistory,
    config: &RiskConfig,
    cancel: &CancellationToken,
) -> Result<PipelineOutput> {
    config.validate()?;

    let history = history.select(&config.tickers)?;
    let returns = history.log_returns()?;
    let statistics = calculate_statistics(&returns)?;

    let portfolio = Portfolio::new(
        config.tickers.clone(),
        config.weights.clone(),
        history.latest_prices()?,
        config.initial_value,
    )?;

    let rng = config.random_source();
    let engine = SimulationEngine::new(&portfolio, &statistics, config.simulation_params())?;
    let simulation = engine.run_with_cancel(&rng, cancel)?;

    let report = calculate_risk_metrics(
        &simulation.portfolio_values,
        portfolio.initial_value,
        config.confidence,
    )?;

    info!(
        portfolio = %portfolio.label(),
        var = report.metrics.var,
        cvar = report.metrics.cvar,
        "pipeline finished"
    );

    Ok(PipelineOutput {
        portfolio,
        statistics,
        simulation,
        report,
        seed: rng.seed(),
        generated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::NaiveDate;

    fn history() -> PriceHistory {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..40).map(|i| start + chrono::Days::new(i)).collect();
        let closes = (0..40)
            .map(|i| {
                let t = i as f64;
                vec![
                    Some(100.0 * (1.0 + 0.01 * (t * 0.7).sin())),
                    Some(50.0 * (1.0 + 0.02 * (t * 1.3).cos())),
                    Some(20.0 + 0.1 * t),
                ]
            })
            .collect();
        PriceHistory::new(
            dates,
            vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()],
            closes,
        )
        .unwrap()
    }

    fn config() -> RiskConfig {
        RiskConfig {
            tickers: vec!["BBB".to_string(), "AAA".to_string()],
            weights: vec![0.4, 0.6],
            horizon_days: 5,
            scenarios: 64,
            block_size: 16,
            seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_uses_selected_tickers() {
        let output = run_pipeline(&history(), &config()).unwrap();

        assert_eq!(output.portfolio.tickers, vec!["BBB", "AAA"]);
        assert_eq!(output.statistics.asset_count(), 2);
        assert_eq!(output.simulation.price_paths.shape(), (5, 64, 2));
        assert_eq!(output.seed, 42);
        assert_eq!(output.label(), "40.0% BBB, 60.0% AAA");

        // Day-0 prices come from the last history row
        let last = history().latest_prices().unwrap();
        assert_eq!(output.simulation.price_paths.prices(0, 0), &[last[1], last[0]]);
    }

    #[test]
    fn test_pipeline_report_matches_terminal_day() {
        let output = run_pipeline(&history(), &config()).unwrap();
        assert_eq!(
            output.report.terminal_values,
            output.simulation.portfolio_values.terminal()
        );
        assert!(output.report.metrics.cvar <= output.report.metrics.var);
    }

    #[test]
    fn test_pipeline_unknown_ticker() {
        let config = RiskConfig {
            tickers: vec!["AAA".to_string(), "ZZZ".to_string()],
            ..config()
        };
        assert!(matches!(
            run_pipeline(&history(), &config),
            Err(Error::Dimension(_))
        ));
    }

    #[test]
    fn test_pipeline_weight_mismatch() {
        let config = RiskConfig {
            weights: vec![1.0],
            ..config()
        };
        assert!(matches!(
            run_pipeline(&history(), &config),
            Err(Error::Dimension(_))
        ));
    }

    #[test]
    fn test_pipeline_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = run_pipeline_with_cancel(&history(), &config(), &token);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
