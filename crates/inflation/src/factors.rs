use crate::error::InflationError;
use crate::InflationPoint;
use chrono::NaiveDate;
use core_types::DailySeries;

/// Builds the daily cumulative inflation factor series over `[start, end]`.
///
/// The periodic observations are converted to decimal rates, sorted
/// ascending, resampled to daily granularity by forward-filling the last
/// known rate, and compounded day by day:
/// `factor[t] = product of (1 + rate[d])` for every day `d <= t` since the
/// first observation. The result is then sliced to the requested range.
///
/// A `start` before the first observation is a coverage gap and is reported
/// as such; it is never treated as zero inflation.
pub fn daily_cumulative_factors(
    points: &[InflationPoint],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<DailySeries, InflationError> {
    let mut sorted: Vec<&InflationPoint> = points.iter().collect();
    sorted.sort_by_key(|p| p.date);

    let first_available = sorted
        .first()
        .map(|p| p.date)
        .ok_or(InflationError::DataUnavailable)?;
    if start < first_available {
        return Err(InflationError::CoverageGap {
            requested: start,
            first_available,
        });
    }

    let mut dates = Vec::new();
    let mut factors = Vec::new();
    let mut idx = 0;
    let mut rate = sorted[0].rate_percent / 100.0;
    let mut factor = 1.0;
    let mut day = first_available;
    while day <= end {
        while idx + 1 < sorted.len() && sorted[idx + 1].date <= day {
            idx += 1;
            rate = sorted[idx].rate_percent / 100.0;
        }
        factor *= 1.0 + rate;
        if day >= start {
            dates.push(day);
            factors.push(factor);
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    Ok(DailySeries::new(dates, factors))
}

/// Deflates a nominal series into real terms: `real[t] = nominal[t] / factor[t]`.
/// Every date in `nominal` must be covered by `factors`.
pub fn deflate(
    nominal: &DailySeries,
    factors: &DailySeries,
) -> Result<DailySeries, InflationError> {
    let factor_start = factors
        .first_date()
        .ok_or(InflationError::DataUnavailable)?;

    let mut values = Vec::with_capacity(nominal.len());
    for (date, value) in nominal.dates.iter().zip(&nominal.values) {
        let offset = (*date - factor_start).num_days();
        if offset < 0 || offset as usize >= factors.len() {
            return Err(InflationError::Alignment { date: *date });
        }
        values.push(value / factors.values[offset as usize]);
    }

    Ok(DailySeries::new(nominal.dates.clone(), values))
}
