//! Validated matrix of daily log-returns.

use crate::{Error, Result};
use nalgebra::DMatrix;

/// Daily log-returns, one row per trading day and one column per asset.
///
/// Every cell is finite; rows with gaps must be dropped before construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LogReturnMatrix(DMatrix<f64>);

impl LogReturnMatrix {
    /// Build from row-major data. The first row fixes the asset count.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let assets = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || assets == 0 {
            return Err(Error::Data("Log-return matrix is empty".to_string()));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != assets) {
            return Err(Error::Dimension(format!(
                "Return row {} has {} values, expected {}",
                i,
                row.len(),
                assets
            )));
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::from_matrix(DMatrix::from_row_slice(rows.len(), assets, &flat))
    }

    /// Wrap an existing (days x assets) matrix.
    pub fn from_matrix(matrix: DMatrix<f64>) -> Result<Self> {
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(Error::Data("Log-return matrix is empty".to_string()));
        }
        if let Some(pos) = matrix.iter().position(|x| !x.is_finite()) {
            // Column-major storage
            let (row, col) = (pos % matrix.nrows(), pos / matrix.nrows());
            return Err(Error::Data(format!(
                "Non-finite log-return at row {}, asset {}",
                row, col
            )));
        }
        Ok(Self(matrix))
    }

    /// Number of trading days (rows).
    pub fn days(&self) -> usize {
        self.0.nrows()
    }

    /// Number of assets (columns).
    pub fn assets(&self) -> usize {
        self.0.ncols()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.0
    }
}
