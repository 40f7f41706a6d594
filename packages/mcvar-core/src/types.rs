//! Core data types shared across the risk pipeline.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A buy-and-hold portfolio: one weight and one day-0 price per ticker.
///
/// Weights are kept exactly as given. They do not need to sum to 1 because the
/// buy-and-hold valuation divides by the weighted day-0 basis, so any common
/// scale factor cancels out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Portfolio {
    /// Ticker symbols, one per asset
    pub tickers: Vec<String>,
    /// Allocation weight per asset
    pub weights: Vec<f64>,
    /// Latest observed price per asset (day 0 of the simulation)
    pub initial_prices: Vec<f64>,
    /// Portfolio value at day 0
    pub initial_value: f64,
}

impl Portfolio {
    /// Create a validated portfolio.
    ///
    /// Fails with `Error::Dimension` when tickers, weights and prices disagree in
    /// length, and with `Error::InvalidParameter` for non-positive prices or value.
    pub fn new(
        tickers: Vec<String>,
        weights: Vec<f64>,
        initial_prices: Vec<f64>,
        initial_value: f64,
    ) -> Result<Self> {
        if tickers.is_empty() {
            return Err(Error::Dimension(
                "Portfolio needs at least one asset".to_string(),
            ));
        }
        if weights.len() != tickers.len() {
            return Err(Error::Dimension(format!(
                "{} weights for {} tickers",
                weights.len(),
                tickers.len()
            )));
        }
        if initial_prices.len() != tickers.len() {
            return Err(Error::Dimension(format!(
                "{} initial prices for {} tickers",
                initial_prices.len(),
                tickers.len()
            )));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "Weight must be finite, got {}",
                w
            )));
        }
        if let Some((i, p)) = initial_prices
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(Error::InvalidParameter(format!(
                "Initial price for {} must be positive, got {}",
                tickers[i], p
            )));
        }
        if !(initial_value.is_finite() && initial_value > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "Initial portfolio value must be positive, got {}",
                initial_value
            )));
        }

        let weight_sum: f64 = weights.iter().sum();
        if (weight_sum - 1.0).abs() > 1e-6 {
            warn!(weight_sum, "portfolio weights do not sum to 1, using them as given");
        }

        Ok(Self {
            tickers,
            weights,
            initial_prices,
            initial_value,
        })
    }

    /// Number of assets in the portfolio.
    pub fn asset_count(&self) -> usize {
        self.tickers.len()
    }

    /// Weighted day-0 price basis (`initial_prices · weights`).
    pub fn weighted_basis(&self) -> f64 {
        self.initial_prices
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| p * w)
            .sum()
    }

    /// Human-readable allocation, e.g. `60.0% THYAO.IS, 40.0% ASELS.IS`.
    pub fn label(&self) -> String {
        self.tickers
            .iter()
            .zip(&self.weights)
            .map(|(t, w)| format!("{:.1}% {}", w * 100.0, t))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Tail-risk summary of a simulated terminal value distribution.
///
/// VaR and CVaR are expressed as profit/loss relative to the initial value, so
/// a loss is a negative number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskMetrics {
    /// Portfolio value at day 0
    pub initial_value: f64,
    /// Confidence level used for VaR/CVaR (e.g., 0.95 for 95%)
    pub confidence_level: f64,
    /// Mean terminal portfolio value across scenarios
    pub mean_final_value: f64,
    /// Worst terminal portfolio value
    pub min_final_value: f64,
    /// Best terminal portfolio value
    pub max_final_value: f64,
    /// Value at Risk: the (1 - confidence) percentile of terminal P&L
    pub var: f64,
    /// Conditional VaR (Expected Shortfall): mean P&L at or below VaR
    pub cvar: f64,
}

impl RiskMetrics {
    /// Terminal portfolio value at the VaR threshold.
    pub fn var_value(&self) -> f64 {
        self.initial_value + self.var
    }

    /// Terminal portfolio value at the CVaR threshold.
    pub fn cvar_value(&self) -> f64 {
        self.initial_value + self.cvar
    }
}

/// API response wrapper for success cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
