//! Tail-risk metrics from simulated portfolio values.
//!
//! Provides empirical VaR and CVaR (expected shortfall) computed on the terminal
//! profit/loss distribution of a Monte Carlo run.

mod metrics;

pub use metrics::{
    calculate_risk_metrics, calculate_tail_metrics, percentile, RiskReport, DEFAULT_CONFIDENCE,
};
