use crate::enums::AllocationMode;
use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The joined result of a multi-symbol daily price fetch.
///
/// All columns share one ascending date index, the union of every symbol's
/// trading days inside the queried range. A date on which a symbol did not
/// trade holds `f64::NAN` in that symbol's columns; gaps for weekends and
/// holidays are expected and are not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub close: HashMap<String, Vec<f64>>,
    pub adj_close: HashMap<String, Vec<f64>>,
}

impl PriceTable {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// The unadjusted closing prices for `symbol`, aligned to `dates`.
    pub fn close_series(&self, symbol: &str) -> Option<&[f64]> {
        self.close.get(symbol).map(Vec::as_slice)
    }

    /// The dividend/split adjusted closing prices for `symbol`, aligned to `dates`.
    pub fn adj_close_series(&self, symbol: &str) -> Option<&[f64]> {
        self.adj_close.get(symbol).map(Vec::as_slice)
    }
}

/// A date-indexed value series, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl DailySeries {
    /// Callers are responsible for passing vectors of equal length.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self { dates, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Divides the series by its first observation so it starts at exactly 1.0,
    /// making series with different absolute levels visually comparable.
    pub fn normalized(&self) -> Result<DailySeries, CoreError> {
        let first = self.first().ok_or(CoreError::EmptySeries)?;
        Ok(DailySeries {
            dates: self.dates.clone(),
            values: self.values.iter().map(|v| v / first).collect(),
        })
    }
}

/// The raw allocation values for a portfolio, paired positionally with the
/// portfolio's symbol list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationScheme {
    pub mode: AllocationMode,
    pub amounts: Vec<f64>,
}

impl AllocationScheme {
    pub fn new(mode: AllocationMode, amounts: Vec<f64>) -> Self {
        Self { mode, amounts }
    }

    pub fn total(&self) -> f64 {
        self.amounts.iter().sum()
    }
}
