//! mcvar CLI - Monte Carlo VaR/CVaR from a closing-price history.
//!
//! Prints JSON envelopes on stdout; logs go to stderr (`RUST_LOG`, default `info`).

use clap::{Parser, Subcommand};
use mcvar_core::{
    calculate_statistics, run_pipeline, ApiResponse, PriceHistory, Result, RiskConfig,
};
use nalgebra::DMatrix;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcvar")]
#[command(about = "Correlated Monte Carlo VaR/CVaR for multi-asset portfolios")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the portfolio and report VaR/CVaR
    Simulate {
        /// Price history JSON file
        #[arg(long)]
        history: PathBuf,
        /// Config file (defaults to ~/.mcvar/config.json or MCVAR_CONFIG_FILE)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Tickers (comma-separated), overrides the config
        #[arg(short, long)]
        tickers: Option<String>,
        /// Weights (comma-separated), overrides the config
        #[arg(short, long)]
        weights: Option<String>,
        /// Initial portfolio value
        #[arg(long)]
        value: Option<f64>,
        /// Simulated trading days
        #[arg(long)]
        horizon: Option<usize>,
        /// Number of scenarios
        #[arg(long)]
        scenarios: Option<usize>,
        /// Confidence level for VaR (0.95 = 95%)
        #[arg(short, long)]
        confidence: Option<f64>,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Include per-scenario terminal values and returns
        #[arg(long)]
        distribution: bool,
    },
    /// Estimate simulation statistics from a price history
    Stats {
        /// Price history JSON file
        #[arg(long)]
        history: PathBuf,
        /// Tickers (comma-separated), defaults to every column
        #[arg(short, long)]
        tickers: Option<String>,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            history,
            config,
            tickers,
            weights,
            value,
            horizon,
            scenarios,
            confidence,
            seed,
            distribution,
        } => load_config(config).and_then(|mut config| {
            if let Some(tickers) = tickers {
                config.tickers = split_list(&tickers);
            }
            if let Some(weights) = weights {
                config.weights = parse_weights(&weights)?;
            }
            if let Some(value) = value {
                config.initial_value = value;
            }
            if let Some(horizon) = horizon {
                config.horizon_days = horizon;
            }
            if let Some(scenarios) = scenarios {
                config.scenarios = scenarios;
            }
            if let Some(confidence) = confidence {
                config.confidence = confidence;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            handle_simulate(history, &config, distribution)
        }),
        Commands::Stats { history, tickers } => handle_stats(history, tickers),
        Commands::Config { action } => handle_config(action),
    };

    let failed = result.is_err();
    println!("{}", render(result));
    if failed {
        std::process::exit(1);
    }
}

fn render(result: Result<Value>) -> String {
    let response = match result {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => ApiResponse::err(e.to_string()),
    };
    serde_json::to_string_pretty(&response)
        .unwrap_or_else(|e| format!(r#"{{"ok":false,"error":"{}"}}"#, e))
}

fn load_config(path: Option<PathBuf>) -> Result<RiskConfig> {
    match path {
        Some(path) => RiskConfig::load(path),
        None => RiskConfig::load_or_default(),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_weights(list: &str) -> Result<Vec<f64>> {
    split_list(list)
        .iter()
        .map(|w| {
            w.parse::<f64>().map_err(|_| {
                mcvar_core::Error::InvalidParameter(format!("Invalid weight: {}", w))
            })
        })
        .collect()
}

fn matrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

fn handle_simulate(history: PathBuf, config: &RiskConfig, distribution: bool) -> Result<Value> {
    let history = PriceHistory::load(history)?;
    let output = run_pipeline(&history, config)?;
    let metrics = output.report.metrics;

    let mut data = json!({
        "portfolio": output.label(),
        "tickers": output.portfolio.tickers,
        "weights": output.portfolio.weights,
        "initial_prices": output.portfolio.initial_prices,
        "horizon_days": config.horizon_days,
        "scenarios": config.scenarios,
        "seed": output.seed,
        "metrics": metrics,
        "var_value": metrics.var_value(),
        "cvar_value": metrics.cvar_value(),
        "generated_at": output.generated_at,
    });
    if distribution {
        data["terminal_values"] = json!(output.report.terminal_values);
        data["returns"] = json!(output.report.returns);
    }
    Ok(data)
}

fn handle_stats(history: PathBuf, tickers: Option<String>) -> Result<Value> {
    let mut history = PriceHistory::load(history)?;
    if let Some(tickers) = tickers {
        history = history.select(&split_list(&tickers))?;
    }
    let statistics = calculate_statistics(&history.log_returns()?)?;

    Ok(json!({
        "tickers": history.tickers,
        "latest_prices": history.latest_prices()?,
        "mean_returns": statistics.mean_returns.as_slice(),
        "daily_drift": statistics.daily_drift.as_slice(),
        "annual_volatility": statistics.annual_volatility().as_slice(),
        "annual_covariance": matrix_rows(&statistics.annual_covariance),
        "correlation": matrix_rows(&statistics.correlation()),
    }))
}

fn handle_config(action: ConfigAction) -> Result<Value> {
    let path = RiskConfig::default_path();
    match action {
        ConfigAction::Show => {
            let config = RiskConfig::load_or_default()?;
            Ok(json!({
                "path": path,
                "exists": path.exists(),
                "config": config,
            }))
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(mcvar_core::Error::InvalidParameter(format!(
                    "{} already exists, use --force to overwrite",
                    path.display()
                )));
            }
            let config = RiskConfig::default();
            config.save(&path)?;
            Ok(json!({
                "path": path,
                "config": config,
            }))
        }
    }
}
