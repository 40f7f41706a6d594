//! Closing-price history and log-return derivation.

use crate::statistics::LogReturnMatrix;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Table of closing prices indexed by trading date and ticker.
///
/// Missing observations are `None` (serialized as JSON `null`). Only rows where
/// every ticker has a price take part in return calculations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceHistory {
    /// Trading dates in ascending order, one per row
    pub dates: Vec<NaiveDate>,
    /// Ticker symbols, one per column
    pub tickers: Vec<String>,
    /// Closing prices, `closes[row][column]`
    pub closes: Vec<Vec<Option<f64>>>,
}

impl PriceHistory {
    /// Create a price history, checking that every row has one cell per ticker.
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        closes: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        let history = Self {
            dates,
            tickers,
            closes,
        };
        history.validate()?;
        Ok(history)
    }

    /// Load a price history from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let history: Self = serde_json::from_str(&content)?;
        history.validate()?;
        Ok(history)
    }

    /// Save the price history as pretty-printed JSON.
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

    fn validate(&self) -> Result<()> {
        if self.tickers.is_empty() {
            return Err(Error::Dimension(
                "Price history needs at least one ticker".to_string(),
            ));
        }
        if self.dates.len() != self.closes.len() {
            return Err(Error::Dimension(format!(
                "{} dates for {} price rows",
                self.dates.len(),
                self.closes.len()
            )));
        }
        if let Some((i, row)) = self
            .closes
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.tickers.len())
        {
            return Err(Error::Dimension(format!(
                "Row {} has {} prices, expected {}",
                i,
                row.len(),
                self.tickers.len()
            )));
        }
        Ok(())
    }

    /// Number of tickers (columns).
    pub fn asset_count(&self) -> usize {
        self.tickers.len()
    }

    /// Restrict and reorder the columns to the given tickers.
    ///
    /// Lookup is case-insensitive; the selected columns keep the history's own
    /// ticker spelling.
    pub fn select(&self, tickers: &[String]) -> Result<Self> {
        let columns = tickers
            .iter()
            .map(|wanted| {
                self.tickers
                    .iter()
                    .position(|t| t.eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        Error::Dimension(format!("Ticker {} not found in price history", wanted))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let closes = self
            .closes
            .iter()
            .map(|row| columns.iter().map(|&c| row[c]).collect())
            .collect();

        let names = columns.iter().map(|&c| self.tickers[c].clone()).collect();

        Self::new(self.dates.clone(), names, closes)
    }

    /// Rows where every ticker has a finite price, in date order.
    pub fn complete_rows(&self) -> Vec<(NaiveDate, Vec<f64>)> {
        self.dates
            .iter()
            .zip(&self.closes)
            .filter_map(|(date, row)| {
                row.iter()
                    .map(|cell| cell.filter(|p| p.is_finite()))
                    .collect::<Option<Vec<f64>>>()
                    .map(|prices| (*date, prices))
            })
            .collect()
    }

    /// Daily log-returns `ln(1 + pct_change)` between consecutive complete rows.
    pub fn log_returns(&self) -> Result<LogReturnMatrix> {
        let rows = self.complete_rows();
        if rows.len() < 2 {
            return Err(Error::Data(format!(
                "Need at least 2 complete price rows for returns, got {}",
                rows.len()
            )));
        }
        if let Some((date, _)) = rows.iter().find(|(_, r)| r.iter().any(|p| *p <= 0.0)) {
            return Err(Error::Data(format!(
                "Non-positive closing price on {}",
                date
            )));
        }

        let returns: Vec<Vec<f64>> = rows
            .windows(2)
            .map(|pair| {
                let (prev, curr) = (&pair[0].1, &pair[1].1);
                prev.iter()
                    .zip(curr)
                    .map(|(p0, p1)| (1.0 + (p1 - p0) / p0).ln())
                    .collect()
            })
            .collect();

        debug!(
            price_rows = self.closes.len(),
            complete_rows = rows.len(),
            return_rows = returns.len(),
            "derived log-returns"
        );

        LogReturnMatrix::from_rows(&returns)
    }

    /// Prices from the last complete row, used as day-0 prices.
    pub fn latest_prices(&self) -> Result<Vec<f64>> {
        self.complete_rows()
            .pop()
            .map(|(_, prices)| prices)
            .ok_or_else(|| Error::Data("Price history has no complete row".to_string()))
    }
}
