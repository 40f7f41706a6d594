//! Simulation parameter estimation from historical log-returns.
//!
//! Provides the annualized covariance matrix, convexity-adjusted daily drift,
//! and the daily Cholesky factor used to correlate simulated shocks.

mod returns;

pub use returns::LogReturnMatrix;

use crate::{Error, Result, TRADING_DAYS_PER_YEAR};
use nalgebra::{Cholesky, DMatrix, DVector};
use tracing::{debug, info, instrument, warn};

/// Smallest squared pivot, relative to its diagonal entry, accepted as non-singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Parameters derived from a log-return matrix, ready for simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationStatistics {
    /// Mean daily log-return per asset
    pub mean_returns: DVector<f64>,
    /// Per-asset daily drift: `mu - 0.5 * diag(annual_cov) / 252`
    pub daily_drift: DVector<f64>,
    /// Lower-triangular factor of the daily covariance (`L_annual / sqrt(252)`)
    pub daily_cholesky: DMatrix<f64>,
    /// Sample covariance of log-returns scaled by 252
    pub annual_covariance: DMatrix<f64>,
}

impl SimulationStatistics {
    /// Number of assets covered by these statistics.
    pub fn asset_count(&self) -> usize {
        self.daily_drift.len()
    }

    /// Annualized volatility per asset (square root of the covariance diagonal).
    pub fn annual_volatility(&self) -> DVector<f64> {
        self.annual_covariance.diagonal().map(f64::sqrt)
    }

    /// Correlation matrix implied by the annual covariance.
    pub fn correlation(&self) -> DMatrix<f64> {
        let vol = self.annual_volatility();
        DMatrix::from_fn(self.asset_count(), self.asset_count(), |i, j| {
            self.annual_covariance[(i, j)] / (vol[i] * vol[j])
        })
    }
}

/// Estimate simulation parameters from daily log-returns.
///
/// # Arguments
///
/// * `returns` - Log-return matrix (trading days x assets)
///
/// # Returns
///
/// `SimulationStatistics`, or `Error::Decomposition` when the annual covariance
/// is not positive-definite (too few observations, collinear series).
#[instrument(skip_all, fields(days = returns.days(), assets = returns.assets()))]
pub fn calculate_statistics(returns: &LogReturnMatrix) -> Result<SimulationStatistics> {
    let days = returns.days();
    let assets = returns.assets();

    if days < 2 {
        return Err(Error::Data(format!(
            "Need at least 2 return observations for a sample covariance, got {}",
            days
        )));
    }
    if days < assets + 1 {
        warn!(days, assets, "fewer observations than assets + 1, covariance is ill-conditioned");
    }

    let mean_returns = column_means(returns.as_matrix());
    let annual_covariance =
        sample_covariance(returns.as_matrix(), &mean_returns) * TRADING_DAYS_PER_YEAR;
    let annual_cholesky = cholesky_lower(&annual_covariance)?;

    // Ito correction per trading day
    let daily_variance = annual_covariance.diagonal() / TRADING_DAYS_PER_YEAR;
    let daily_drift = &mean_returns - daily_variance * 0.5;
    let daily_cholesky = annual_cholesky / TRADING_DAYS_PER_YEAR.sqrt();

    debug!(drift = ?daily_drift.as_slice(), "daily drift");
    info!(days, assets, "simulation statistics estimated");

    Ok(SimulationStatistics {
        mean_returns,
        daily_drift,
        daily_cholesky,
        annual_covariance,
    })
}

/// Column-wise mean of a (days x assets) matrix.
pub fn column_means(data: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(data.ncols(), data.column_iter().map(|c| c.mean()))
}

/// Unbiased sample covariance (denominator `rows - 1`).
pub fn sample_covariance(data: &DMatrix<f64>, means: &DVector<f64>) -> DMatrix<f64> {
    let mut centered = data.clone();
    for (mut column, mean) in centered.column_iter_mut().zip(means.iter()) {
        column.add_scalar_mut(-mean);
    }
    let denom = (data.nrows() - 1) as f64;
    (centered.transpose() * &centered) / denom
}

/// Lower-triangular Cholesky factor `L` with `L * L^T = matrix`.
///
/// Fails with `Error::Decomposition` if the matrix is not symmetric
/// positive-definite.
pub fn cholesky_lower(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if !matrix.is_square() {
        return Err(Error::Dimension(format!(
            "Cholesky needs a square matrix, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|x| !x.is_finite()) {
        return Err(Error::Decomposition(
            "Covariance matrix contains non-finite values".to_string(),
        ));
    }

    let lower = Cholesky::new(matrix.clone())
        .map(|c| c.l())
        .ok_or_else(|| {
            Error::Decomposition("Covariance matrix is not positive-definite".to_string())
        })?;

    // Rounding leaves tiny positive pivots for singular PSD input
    let singular = lower
        .diagonal()
        .iter()
        .zip(matrix.diagonal().iter())
        .any(|(d, a)| !(d.is_finite() && d * d > PIVOT_TOLERANCE * a));
    if singular || lower.iter().any(|x| !x.is_finite()) {
        return Err(Error::Decomposition(
            "Covariance matrix is singular".to_string(),
        ));
    }

    Ok(lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_returns() -> LogReturnMatrix {
        LogReturnMatrix::from_rows(&[
            vec![0.010, 0.004],
            vec![-0.005, 0.002],
            vec![0.008, -0.006],
            vec![-0.003, 0.001],
            vec![0.012, 0.009],
            vec![-0.007, -0.004],
        ])
        .unwrap()
    }

    #[test]
    fn test_column_means() {
        let means = column_means(sample_returns().as_matrix());
        assert_relative_eq!(means[0], 0.015 / 6.0, epsilon = 1e-15);
        assert_relative_eq!(means[1], 0.006 / 6.0, epsilon = 1e-15);
    }

    #[test]
    fn test_sample_covariance_matches_definition() {
        let data = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 9.0]);
        let means = column_means(&data);
        let cov = sample_covariance(&data, &means);

        // var(x) = 1, var(y) = 13, cov(x, y) = 3.5 with ddof = 1
        assert_relative_eq!(cov[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 1)], 13.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 1)], 3.5, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 0)], 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_reconstruction() {
        let stats = calculate_statistics(&sample_returns()).unwrap();
        let annual_l = &stats.daily_cholesky * TRADING_DAYS_PER_YEAR.sqrt();
        let rebuilt = &annual_l * annual_l.transpose();

        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(
                    rebuilt[(i, j)],
                    stats.annual_covariance[(i, j)],
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_cholesky_is_lower_triangular() {
        let stats = calculate_statistics(&sample_returns()).unwrap();
        assert_eq!(stats.daily_cholesky[(0, 1)], 0.0);
        assert!(stats.daily_cholesky[(0, 0)] > 0.0);
        assert!(stats.daily_cholesky[(1, 1)] > 0.0);
    }

    #[test]
    fn test_daily_drift_convexity_correction() {
        let stats = calculate_statistics(&sample_returns()).unwrap();
        for i in 0..2 {
            let expected = stats.mean_returns[i]
                - 0.5 * stats.annual_covariance[(i, i)] / TRADING_DAYS_PER_YEAR;
            assert_relative_eq!(stats.daily_drift[i], expected, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_daily_cholesky_squares_to_daily_covariance() {
        let stats = calculate_statistics(&sample_returns()).unwrap();
        let daily = &stats.daily_cholesky * stats.daily_cholesky.transpose();
        let expected = &stats.annual_covariance / TRADING_DAYS_PER_YEAR;
        assert_relative_eq!(daily, expected, epsilon = 1e-15);
    }

    #[test]
    fn test_single_asset_reduces_to_std_dev() {
        let returns =
            LogReturnMatrix::from_rows(&[vec![0.01], vec![-0.02], vec![0.015], vec![0.0]])
                .unwrap();
        let stats = calculate_statistics(&returns).unwrap();

        let data = [0.01, -0.02, 0.015, 0.0];
        let mean = data.iter().sum::<f64>() / 4.0;
        let var = data.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 3.0;

        assert_eq!(stats.daily_cholesky.shape(), (1, 1));
        assert_relative_eq!(stats.daily_cholesky[(0, 0)], var.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            stats.annual_volatility()[0],
            (var * TRADING_DAYS_PER_YEAR).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_collinear_returns_fail_decomposition() {
        // Second asset is exactly twice the first
        let returns = LogReturnMatrix::from_rows(&[
            vec![0.01, 0.02],
            vec![-0.02, -0.04],
            vec![0.03, 0.06],
            vec![0.00, 0.00],
        ])
        .unwrap();
        let result = calculate_statistics(&returns);
        assert!(matches!(result, Err(Error::Decomposition(_))));
    }

    #[test]
    fn test_fewer_observations_than_assets_fail_decomposition() {
        let returns = LogReturnMatrix::from_rows(&[
            vec![0.01, 0.02, -0.01],
            vec![-0.02, 0.01, 0.03],
        ])
        .unwrap();
        let result = calculate_statistics(&returns);
        assert!(matches!(result, Err(Error::Decomposition(_))));
    }

    #[test]
    fn test_single_observation_is_insufficient() {
        let returns = LogReturnMatrix::from_rows(&[vec![0.01, 0.02]]).unwrap();
        let result = calculate_statistics(&returns);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_correlation_diagonal_is_one() {
        let stats = calculate_statistics(&sample_returns()).unwrap();
        let corr = stats.correlation();
        assert_relative_eq!(corr[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(corr[(1, 1)], 1.0, epsilon = 1e-12);
        assert!(corr[(0, 1)].abs() <= 1.0);
    }

    #[test]
    fn test_cholesky_lower_rejects_indefinite() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(cholesky_lower(&m), Err(Error::Decomposition(_))));
    }

    #[test]
    fn test_cholesky_lower_rejects_non_square() {
        let m = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(matches!(cholesky_lower(&m), Err(Error::Dimension(_))));
    }
}
