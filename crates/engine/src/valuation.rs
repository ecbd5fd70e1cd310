use crate::allocation::PositionSizing;
use crate::error::EngineError;
use chrono::NaiveDate;
use core_types::DailySeries;

/// Builds the portfolio's nominal value series on the joined date index.
/// `columns` are per-asset close prices in scheme order. NaN cells (days an
/// asset did not trade) flow straight into the sum for that day.
pub fn build_value_series(
    dates: &[NaiveDate],
    columns: &[&[f64]],
    sizing: &PositionSizing,
) -> DailySeries {
    let scales = match sizing {
        PositionSizing::Weights(weights) => weights,
        PositionSizing::Shares(shares) => shares,
    };

    let mut values = Vec::with_capacity(dates.len());
    for t in 0..dates.len() {
        let mut value = 0.0;
        for (column, scale) in columns.iter().zip(scales) {
            value += column[t] * scale;
        }
        values.push(value);
    }

    DailySeries::new(dates.to_vec(), values)
}

/// Portfolio total return in percent: the weighted sum of each asset's
/// adjusted-close growth. This is attribution over adjusted prices, not the
/// growth of the constructed value series; with dividends or splits in the
/// period the two legitimately differ.
pub fn weighted_total_return_pct(adj_columns: &[&[f64]], weights: &[f64]) -> f64 {
    adj_columns
        .iter()
        .zip(weights)
        .map(|(column, weight)| weight * (ratio_last_over_first(column) - 1.0))
        .sum::<f64>()
        * 100.0
}

/// Total return in percent of a single price series.
pub fn total_return_pct(values: &[f64]) -> f64 {
    (ratio_last_over_first(values) - 1.0) * 100.0
}

pub fn ratio_last_over_first(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => last / first,
        _ => f64::NAN,
    }
}

/// Annualized return in percent: `ratio^(365 / days_elapsed) - 1`, with
/// `days_elapsed` in calendar days. A negative ratio cannot be raised to a
/// fractional power, so that case is reported instead of yielding NaN.
pub fn annualized_return_pct(ratio: f64, days_elapsed: i64) -> Result<f64, EngineError> {
    if days_elapsed == 0 {
        return Err(EngineError::DivisionByZeroDays);
    }
    let annualized = ratio.powf(365.0 / days_elapsed as f64);
    if annualized.is_nan() && ratio < 0.0 {
        return Err(EngineError::InvalidExponent { ratio });
    }
    Ok((annualized - 1.0) * 100.0)
}
