//! Simulated price and portfolio value arrays.

use serde::{Deserialize, Serialize};

/// Portfolio value per (day, scenario), stored day-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawValuePath")]
pub struct PortfolioValuePath {
    days: usize,
    scenarios: usize,
    values: Vec<f64>,
}

impl PortfolioValuePath {
    /// Wrap day-major values. Returns `None` if the length is not `days * scenarios`.
    pub fn from_vec(days: usize, scenarios: usize, values: Vec<f64>) -> Option<Self> {
        (days.checked_mul(scenarios) == Some(values.len())).then_some(Self {
            days,
            scenarios,
            values,
        })
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn scenarios(&self) -> usize {
        self.scenarios
    }

    /// `(days, scenarios)`
    pub fn shape(&self) -> (usize, usize) {
        (self.days, self.scenarios)
    }

    pub fn get(&self, day: usize, scenario: usize) -> f64 {
        self.values[day * self.scenarios + scenario]
    }

    /// All scenario values on one day.
    pub fn day(&self, day: usize) -> &[f64] {
        let start = day * self.scenarios;
        &self.values[start..start + self.scenarios]
    }

    /// Values on the last simulated day.
    pub fn terminal(&self) -> &[f64] {
        if self.days == 0 {
            return &[];
        }
        self.day(self.days - 1)
    }

    /// One scenario's value across all days.
    pub fn scenario(&self, scenario: usize) -> Vec<f64> {
        (0..self.days).map(|d| self.get(d, scenario)).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Asset price per (day, scenario, asset), stored day-major then scenario-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawPriceTensor")]
pub struct PricePathTensor {
    days: usize,
    scenarios: usize,
    assets: usize,
    prices: Vec<f64>,
}

impl PricePathTensor {
    /// Wrap flat prices. Returns `None` if the length is not `days * scenarios * assets`.
    pub fn from_vec(
        days: usize,
        scenarios: usize,
        assets: usize,
        prices: Vec<f64>,
    ) -> Option<Self> {
        let expected = days
            .checked_mul(scenarios)
            .and_then(|n| n.checked_mul(assets));
        (expected == Some(prices.len())).then_some(Self {
            days,
            scenarios,
            assets,
            prices,
        })
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn scenarios(&self) -> usize {
        self.scenarios
    }

    pub fn assets(&self) -> usize {
        self.assets
    }

    /// `(days, scenarios, assets)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.days, self.scenarios, self.assets)
    }

    /// Total number of stored prices.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn get(&self, day: usize, scenario: usize, asset: usize) -> f64 {
        self.prices[(day * self.scenarios + scenario) * self.assets + asset]
    }

    /// Asset prices of one scenario on one day.
    pub fn prices(&self, day: usize, scenario: usize) -> &[f64] {
        let start = (day * self.scenarios + scenario) * self.assets;
        &self.prices[start..start + self.assets]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.prices
    }
}

/// Wire form of [`PortfolioValuePath`], checked by `from_vec` on the way in.
#[derive(Deserialize)]
struct RawValuePath {
    days: usize,
    scenarios: usize,
    values: Vec<f64>,
}

impl TryFrom<RawValuePath> for PortfolioValuePath {
    type Error = String;

    fn try_from(raw: RawValuePath) -> Result<Self, Self::Error> {
        let len = raw.values.len();
        Self::from_vec(raw.days, raw.scenarios, raw.values).ok_or_else(|| {
            format!(
                "{} values do not fill {} days x {} scenarios",
                len, raw.days, raw.scenarios
            )
        })
    }
}

/// Wire form of [`PricePathTensor`], checked by `from_vec` on the way in.
#[derive(Deserialize)]
struct RawPriceTensor {
    days: usize,
    scenarios: usize,
    assets: usize,
    prices: Vec<f64>,
}

impl TryFrom<RawPriceTensor> for PricePathTensor {
    type Error = String;

    fn try_from(raw: RawPriceTensor) -> Result<Self, Self::Error> {
        let len = raw.prices.len();
        Self::from_vec(raw.days, raw.scenarios, raw.assets, raw.prices).ok_or_else(|| {
            format!(
                "{} prices do not fill {} days x {} scenarios x {} assets",
                len, raw.days, raw.scenarios, raw.assets
            )
        })
    }
}
