//! VaR and CVaR calculation on the terminal value distribution.

use crate::simulation::PortfolioValuePath;
use crate::types::RiskMetrics;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Confidence level used when none is configured.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Risk metrics together with the raw distributions they were computed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskReport {
    /// Summary statistics
    pub metrics: RiskMetrics,
    /// Portfolio value of every scenario on the last day
    pub terminal_values: Vec<f64>,
    /// Terminal value minus initial value, per scenario
    pub returns: Vec<f64>,
}

/// Calculate VaR/CVaR from the last day of a simulated value path.
///
/// # Arguments
///
/// * `values` - Portfolio value per (day, scenario)
/// * `initial_value` - Portfolio value at day 0
/// * `confidence` - Confidence level (typically 0.95 for 95%)
///
/// # Returns
///
/// A `RiskReport`, or `Error::UndefinedMetric` when no scenario falls at or below
/// VaR.
pub fn calculate_risk_metrics(
    values: &PortfolioValuePath,
    initial_value: f64,
    confidence: f64,
) -> Result<RiskReport> {
    calculate_tail_metrics(values.terminal(), initial_value, confidence)
}

/// Calculate VaR/CVaR from a terminal value distribution.
///
/// VaR is the `(1 - confidence) * 100`-th percentile of `terminal - initial_value`
/// (linear interpolation between closest ranks), so a loss is negative. CVaR is
/// the mean of every return at or below VaR.
///
/// An interpolated percentile never falls below the smallest return, so the
/// tail always holds at least that scenario for finite input. An empty tail is
/// reported as `Error::UndefinedMetric`, never as `NaN`.
#[instrument(skip(terminal_values), fields(scenarios = terminal_values.len()))]
pub fn calculate_tail_metrics(
    terminal_values: &[f64],
    initial_value: f64,
    confidence: f64,
) -> Result<RiskReport> {
    if !(confidence.is_finite() && confidence > 0.0 && confidence < 1.0) {
        return Err(Error::InvalidParameter(format!(
            "Confidence level must be in (0, 1), got {}",
            confidence
        )));
    }
    if !(initial_value.is_finite() && initial_value > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "Initial portfolio value must be positive, got {}",
            initial_value
        )));
    }
    if terminal_values.is_empty() {
        return Err(Error::Data(
            "Terminal value distribution is empty".to_string(),
        ));
    }
    if terminal_values.iter().any(|v| !v.is_finite()) {
        return Err(Error::Data(
            "Terminal value distribution contains non-finite values".to_string(),
        ));
    }

    let n = terminal_values.len() as f64;
    let returns: Vec<f64> = terminal_values.iter().map(|v| v - initial_value).collect();

    let var = percentile(&returns, (1.0 - confidence) * 100.0).ok_or_else(|| {
        Error::UndefinedMetric("VaR percentile of an empty distribution".to_string())
    })?;

    let (cvar, tail) = tail_mean(&returns, var)?;

    let mean_final_value = terminal_values.iter().sum::<f64>() / n;
    let min_final_value = terminal_values.iter().copied().fold(f64::INFINITY, f64::min);
    let max_final_value = terminal_values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    info!(var, cvar, tail, "risk metrics computed");

    Ok(RiskReport {
        metrics: RiskMetrics {
            initial_value,
            confidence_level: confidence,
            mean_final_value,
            min_final_value,
            max_final_value,
            var,
            cvar,
        },
        terminal_values: terminal_values.to_vec(),
        returns,
    })
}

/// Mean of every return at or below `var`, with the tail size.
///
/// Fails with `Error::UndefinedMetric` when no return reaches the threshold.
fn tail_mean(returns: &[f64], var: f64) -> Result<(f64, usize)> {
    let (sum, count) = returns
        .iter()
        .filter(|r| **r <= var)
        .fold((0.0, 0usize), |(sum, count), r| (sum + r, count + 1));
    if count == 0 {
        return Err(Error::UndefinedMetric(format!(
            "No scenario at or below VaR {:.4}, CVaR is undefined",
            var
        )));
    }
    Ok((sum / count as f64, count))
}

/// Percentile `q` (0-100) with linear interpolation between closest ranks.
///
/// Returns `None` for empty input or `q` outside `[0, 100]`.
pub fn percentile(data: &[f64], q: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentile_linear_interpolation() {
        let data = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&data, 0.0), Some(1.0));
        assert_eq!(percentile(&data, 50.0), Some(3.0));
        assert_eq!(percentile(&data, 100.0), Some(5.0));
        // rank = 0.05 * 4 = 0.2
        assert_relative_eq!(percentile(&data, 5.0).unwrap(), 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_percentile_invalid() {
        assert_eq!(percentile(&[], 5.0), None);
        assert_eq!(percentile(&[1.0], 101.0), None);
        assert_eq!(percentile(&[1.0], -1.0), None);
    }

    #[test]
    fn test_calculate_tail_metrics() {
        // 20 scenarios: 80k, 82k, ..., 118k
        let terminal: Vec<f64> = (0..20).map(|i| 80_000.0 + 2_000.0 * i as f64).collect();
        let report = calculate_tail_metrics(&terminal, 100_000.0, 0.95).unwrap();
        let m = report.metrics;

        // 5th percentile rank = 0.05 * 19 = 0.95 -> -20000 + 0.95 * 2000
        assert_relative_eq!(m.var, -18_100.0, epsilon = 1e-6);
        // Only -20000 is at or below VaR
        assert_relative_eq!(m.cvar, -20_000.0, epsilon = 1e-6);
        assert_relative_eq!(m.mean_final_value, 99_000.0, epsilon = 1e-6);
        assert_eq!(m.min_final_value, 80_000.0);
        assert_eq!(m.max_final_value, 118_000.0);
        assert_eq!(m.initial_value, 100_000.0);
        assert_eq!(m.confidence_level, 0.95);
        assert_eq!(report.returns.len(), 20);
        assert_eq!(report.returns[0], -20_000.0);
    }

    #[test]
    fn test_cvar_not_above_var() {
        let terminal: Vec<f64> = (0..1000)
            .map(|i| 100_000.0 + ((i * 7919) % 1000) as f64 * 37.0 - 18_000.0)
            .collect();
        for confidence in [0.9, 0.95, 0.99] {
            let m = calculate_tail_metrics(&terminal, 100_000.0, confidence)
                .unwrap()
                .metrics;
            assert!(m.cvar <= m.var);
        }
    }

    #[test]
    fn test_all_gains_still_defined() {
        let terminal = vec![101_000.0, 102_000.0, 103_000.0];
        let m = calculate_tail_metrics(&terminal, 100_000.0, 0.95).unwrap().metrics;
        assert!(m.var > 0.0);
        assert!(m.cvar <= m.var);
    }

    #[test]
    fn test_single_scenario() {
        let m = calculate_tail_metrics(&[95_000.0], 100_000.0, 0.95).unwrap().metrics;
        assert_eq!(m.var, -5_000.0);
        assert_eq!(m.cvar, -5_000.0);
    }

    #[test]
    fn test_tail_mean() {
        let (mean, count) = tail_mean(&[-300.0, -100.0, 50.0, 200.0], -100.0).unwrap();
        assert_relative_eq!(mean, -200.0, epsilon = 1e-12);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_tail_mean_empty_tail_is_undefined() {
        let result = tail_mean(&[10.0, 20.0, 30.0], 5.0);
        assert!(matches!(result, Err(Error::UndefinedMetric(_))));
    }

    #[test]
    fn test_rejects_invalid_confidence() {
        for confidence in [0.0, 1.0, 1.5, -0.1, f64::NAN] {
            let result = calculate_tail_metrics(&[1.0, 2.0], 1.0, confidence);
            assert!(matches!(result, Err(Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_rejects_empty_distribution() {
        let result = calculate_tail_metrics(&[], 100.0, 0.95);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let result = calculate_tail_metrics(&[100.0, f64::NAN], 100.0, 0.95);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_calculate_risk_metrics_uses_last_day() {
        // 2 days x 3 scenarios
        let path = PortfolioValuePath::from_vec(
            2,
            3,
            vec![1_000.0, 1_000.0, 1_000.0, 900.0, 1_050.0, 1_100.0],
        )
        .unwrap();
        let report = calculate_risk_metrics(&path, 1_000.0, 0.95).unwrap();

        assert_eq!(report.terminal_values, vec![900.0, 1_050.0, 1_100.0]);
        assert_eq!(report.returns, vec![-100.0, 50.0, 100.0]);
        // rank = 0.05 * 2 = 0.1 -> -100 + 0.1 * 150
        assert_relative_eq!(report.metrics.var, -85.0, epsilon = 1e-9);
        assert_relative_eq!(report.metrics.cvar, -100.0, epsilon = 1e-9);
    }
}
