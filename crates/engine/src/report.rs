use core_types::DailySeries;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The complete result of one backtest run.
///
/// The series are normalized to start at 1.0 (and deflated into real terms
/// when inflation adjustment was applied); the return percentages are always
/// nominal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub run_id: Uuid,

    pub portfolio_series: DailySeries,
    pub baseline_series: DailySeries,

    pub portfolio_return_pct: f64,
    pub portfolio_annualized_return_pct: f64,
    pub baseline_return_pct: f64,
    pub baseline_annualized_return_pct: f64,

    /// Whether the series were actually deflated. False either when the
    /// caller did not ask for the adjustment or when the inflation source
    /// was unavailable and the run fell back to nominal values.
    pub inflation_adjusted: bool,
}
