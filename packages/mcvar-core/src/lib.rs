//! mcvar core - Correlated Monte Carlo risk library.
//!
//! This crate estimates the distribution of a multi-asset portfolio's value over a
//! fixed horizon and derives tail-risk statistics from it:
//!
//! - **Market data**: Closing-price tables to log-returns and day-0 prices
//! - **Statistics**: Annualized covariance, convexity-adjusted drift, Cholesky factor
//! - **Simulation**: Correlated geometric Brownian motion across scenario blocks
//! - **Risk metrics**: VaR and CVaR from the terminal value distribution
//!
//! # Example
//!
//! ```rust,no_run
//! use mcvar_core::{run_pipeline, PriceHistory, RiskConfig};
//!
//! let history = PriceHistory::load("history.json")?;
//! let config = RiskConfig::load("config.json")?;
//!
//! let output = run_pipeline(&history, &config)?;
//! println!("VaR {:.2}", output.report.metrics.var);
//! println!("CVaR {:.2}", output.report.metrics.cvar);
//! # Ok::<(), mcvar_core::Error>(())
//! ```

pub mod config;
pub mod market;
pub mod pipeline;
pub mod risk;
pub mod simulation;
pub mod statistics;
pub mod types;

// Re-export commonly used types
pub use config::RiskConfig;
pub use market::PriceHistory;
pub use pipeline::{run_pipeline, run_pipeline_with_cancel, PipelineOutput};
pub use risk::{calculate_risk_metrics, percentile, RiskReport, DEFAULT_CONFIDENCE};
pub use simulation::{
    CancellationToken, PortfolioValuePath, PricePathTensor, RandomSource, SimulationEngine,
    SimulationOutput, SimulationParams,
};
pub use statistics::{calculate_statistics, LogReturnMatrix, SimulationStatistics};
pub use types::{ApiResponse, Portfolio, RiskMetrics};

/// Number of trading days used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Error types for mcvar-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Dimension mismatch: {0}")]
    Dimension(String),

    #[error("Decomposition failed: {0}")]
    Decomposition(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Undefined metric: {0}")]
    UndefinedMetric(String),

    #[error("Simulation cancelled")]
    Cancelled,
}

/// Result type for mcvar-core operations.
pub type Result<T> = std::result::Result<T, Error>;
