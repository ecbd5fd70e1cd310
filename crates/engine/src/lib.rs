//! # Meridian Valuation Engine
//!
//! Turns per-asset price series plus an allocation scheme into a normalized
//! portfolio value series, a normalized baseline series, and total and
//! annualized returns for both, with an optional inflation deflation pass.
//!
//! ## Architectural Principles
//!
//! - The engine consumes its collaborators (price and inflation data)
//!   through abstract client traits, so runs are testable without a network.
//! - One run is one blocking computation: it either produces a complete
//!   report or a single terminal error, never a partial result.

use crate::allocation::PositionSizing;
use chrono::NaiveDate;
use core_types::{AllocationScheme, DailySeries};
use inflation::InflationDataClient;
use market_data::PriceDataClient;
use uuid::Uuid;

pub mod allocation;
pub mod error;
pub mod report;
pub mod valuation;

// Re-export the key components to create a clean, public-facing API.
pub use error::EngineError;
pub use report::BacktestReport;

/// The full set of inputs for one run.
#[derive(Debug, Clone)]
pub struct BacktestRequest {
    /// Portfolio tickers, excluding the baseline. Must be unique.
    pub symbols: Vec<String>,
    /// Raw allocations paired positionally with `symbols`.
    pub scheme: AllocationScheme,
    pub baseline: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Deflate the output series by historical inflation when possible.
    pub inflation_adjusted: bool,
    pub inflation_country: String,
}

pub struct BacktestEngine {
    price_client: Box<dyn PriceDataClient>,
    inflation_client: Box<dyn InflationDataClient>,
}

impl BacktestEngine {
    pub fn new(
        price_client: Box<dyn PriceDataClient>,
        inflation_client: Box<dyn InflationDataClient>,
    ) -> Self {
        Self {
            price_client,
            inflation_client,
        }
    }

    /// Runs one backtest: validate, fetch, value, and summarize.
    pub async fn run(&self, request: &BacktestRequest) -> Result<BacktestReport, EngineError> {
        let run_id = Uuid::new_v4();
        tracing::info!(
            "Backtest {} starting: {:?} vs {} from {} to {}",
            run_id,
            request.symbols,
            request.baseline,
            request.start_date,
            request.end_date
        );

        // 1. Resolve attribution weights. This validates the scheme before
        //    anything is fetched.
        let weights = allocation::attribution_weights(&request.symbols, &request.scheme)?;

        // 2. Fetch every portfolio symbol plus the baseline in one call.
        let mut fetch_symbols = request.symbols.clone();
        if !fetch_symbols.contains(&request.baseline) {
            fetch_symbols.push(request.baseline.clone());
        }
        let table = self
            .price_client
            .fetch_daily_prices(&fetch_symbols, request.start_date, request.end_date)
            .await?;
        if table.is_empty() {
            return Err(EngineError::AssetDataUnavailable);
        }

        // 3. Check alignment: every requested column must have come back.
        let mut closes: Vec<&[f64]> = Vec::with_capacity(request.symbols.len());
        let mut adjusted: Vec<&[f64]> = Vec::with_capacity(request.symbols.len());
        for symbol in &request.symbols {
            let close = table
                .close_series(symbol)
                .ok_or_else(|| EngineError::AssetMissingFromFetch(symbol.clone()))?;
            let adj = table
                .adj_close_series(symbol)
                .ok_or_else(|| EngineError::AssetMissingFromFetch(symbol.clone()))?;
            closes.push(close);
            adjusted.push(adj);
        }
        let baseline_close = table
            .close_series(&request.baseline)
            .ok_or_else(|| EngineError::BaselineMissingFromFetch(request.baseline.clone()))?;
        let baseline_adj = table
            .adj_close_series(&request.baseline)
            .ok_or_else(|| EngineError::BaselineMissingFromFetch(request.baseline.clone()))?;

        // 4. Build the nominal value series.
        let first_closes: Vec<f64> = closes.iter().map(|c| c[0]).collect();
        let sizing: PositionSizing =
            allocation::position_sizing(&request.scheme, &weights, &first_closes);
        let value_series = valuation::build_value_series(&table.dates, &closes, &sizing);

        // 5. Returns. Total return attributes adjusted-close growth by
        //    weight; the annualized portfolio figure compounds the value
        //    series itself while the baseline compounds its adjusted close.
        let portfolio_return_pct = valuation::weighted_total_return_pct(&adjusted, &weights);
        let baseline_return_pct = valuation::total_return_pct(baseline_adj);

        let days_elapsed = (request.end_date - request.start_date).num_days();
        let portfolio_ratio = valuation::ratio_last_over_first(&value_series.values);
        let portfolio_annualized_return_pct =
            valuation::annualized_return_pct(portfolio_ratio, days_elapsed)?;
        let baseline_ratio = valuation::ratio_last_over_first(baseline_adj);
        let baseline_annualized_return_pct =
            valuation::annualized_return_pct(baseline_ratio, days_elapsed)?;

        // 6. Normalize both display series to start at 1.0.
        let mut portfolio_series = value_series.normalized()?;
        let mut baseline_series =
            DailySeries::new(table.dates.clone(), baseline_close.to_vec()).normalized()?;

        // 7. Optional deflation into real terms. An unavailable source falls
        //    back to nominal output; a coverage gap is a terminal error.
        let mut inflation_applied = false;
        if request.inflation_adjusted {
            match self
                .inflation_client
                .fetch_inflation(&request.inflation_country)
                .await
            {
                Ok(points) if points.is_empty() => {
                    tracing::warn!(
                        "Inflation source returned no observations for {}; reporting nominal series",
                        request.inflation_country
                    );
                }
                Ok(points) => {
                    if let (Some(first), Some(last)) =
                        (portfolio_series.first_date(), portfolio_series.last_date())
                    {
                        let factors = inflation::daily_cumulative_factors(&points, first, last)?;
                        portfolio_series = inflation::deflate(&portfolio_series, &factors)?;
                        baseline_series = inflation::deflate(&baseline_series, &factors)?;
                        inflation_applied = true;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to fetch inflation data: {}; reporting nominal series",
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Backtest {} finished: portfolio {:.2}% vs baseline {:.2}% over {} trading days",
            run_id,
            portfolio_return_pct,
            baseline_return_pct,
            portfolio_series.len()
        );

        Ok(BacktestReport {
            run_id,
            portfolio_series,
            baseline_series,
            portfolio_return_pct,
            portfolio_annualized_return_pct,
            baseline_return_pct,
            baseline_annualized_return_pct,
            inflation_adjusted: inflation_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use core_types::{AllocationMode, PriceTable};
    use inflation::error::InflationError;
    use inflation::InflationPoint;
    use market_data::error::MarketDataError;
    use std::collections::HashMap;

    struct FixedPrices {
        table: PriceTable,
    }

    #[async_trait]
    impl PriceDataClient for FixedPrices {
        async fn fetch_daily_prices(
            &self,
            _symbols: &[String],
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<PriceTable, MarketDataError> {
            Ok(self.table.clone())
        }
    }

    enum FixedInflation {
        Points(Vec<InflationPoint>),
        Unavailable,
    }

    #[async_trait]
    impl InflationDataClient for FixedInflation {
        async fn fetch_inflation(
            &self,
            _country: &str,
        ) -> Result<Vec<InflationPoint>, InflationError> {
            match self {
                FixedInflation::Points(points) => Ok(points.clone()),
                FixedInflation::Unavailable => Err(InflationError::DataUnavailable),
            }
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Three trading days for AAPL, MSFT and SPY with adj == close.
    fn sample_table() -> PriceTable {
        let dates = vec![date(2020, 1, 2), date(2020, 1, 3), date(2020, 1, 6)];
        let close = HashMap::from([
            ("AAPL".to_string(), vec![10.0, 11.0, 12.0]),
            ("MSFT".to_string(), vec![20.0, 22.0, 26.0]),
            ("SPY".to_string(), vec![100.0, 110.0, 121.0]),
        ]);
        PriceTable {
            dates,
            adj_close: close.clone(),
            close,
        }
    }

    fn engine(table: PriceTable, inflation: FixedInflation) -> BacktestEngine {
        BacktestEngine::new(Box::new(FixedPrices { table }), Box::new(inflation))
    }

    fn request(scheme: AllocationScheme) -> BacktestRequest {
        BacktestRequest {
            symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
            scheme,
            baseline: "SPY".to_string(),
            start_date: date(2020, 1, 1),
            end_date: date(2021, 1, 1),
            inflation_adjusted: false,
            inflation_country: "united-states".to_string(),
        }
    }

    #[tokio::test]
    async fn sixty_forty_portfolio_vs_baseline() {
        let engine = engine(sample_table(), FixedInflation::Unavailable);
        let scheme = AllocationScheme::new(AllocationMode::Percentage, vec![60.0, 40.0]);
        let report = engine.run(&request(scheme)).await.unwrap();

        // Normalized series starts at exactly 1.0 and ends at the weighted
        // blend of the two close-price ratios.
        assert_eq!(report.portfolio_series.first().unwrap(), 1.0);
        assert_relative_eq!(
            report.portfolio_series.last().unwrap(),
            17.6 / 14.0,
            max_relative = 1e-12
        );

        // Weighted adjusted-close attribution: 0.6*20% + 0.4*30%.
        assert_relative_eq!(report.portfolio_return_pct, 24.0, max_relative = 1e-12);
        assert_relative_eq!(report.baseline_return_pct, 21.0, max_relative = 1e-12);
        assert_eq!(report.baseline_series.first().unwrap(), 1.0);
        assert!(!report.inflation_adjusted);
    }

    #[tokio::test]
    async fn bad_percentage_sum_fails_before_any_series_is_built() {
        let engine = engine(sample_table(), FixedInflation::Unavailable);
        let scheme = AllocationScheme::new(AllocationMode::Percentage, vec![50.0, 60.0]);
        assert!(matches!(
            engine.run(&request(scheme)).await,
            Err(EngineError::AllocationSumInvalid { sum }) if sum == 110.0
        ));
    }

    #[tokio::test]
    async fn dollar_mode_values_positions_by_shares() {
        let dates = vec![date(2020, 1, 2), date(2020, 1, 3), date(2020, 1, 6)];
        let close = HashMap::from([
            ("AAPL".to_string(), vec![100.0, 110.0, 120.0]),
            ("SPY".to_string(), vec![100.0, 100.0, 100.0]),
        ]);
        let table = PriceTable {
            dates,
            adj_close: close.clone(),
            close,
        };
        let engine = engine(table, FixedInflation::Unavailable);

        let mut req = request(AllocationScheme::new(AllocationMode::Dollar, vec![1000.0]));
        req.symbols = vec!["AAPL".to_string()];
        let report = engine.run(&req).await.unwrap();

        // 1000 / 100 = 10 shares, so the value series is 10 * close.
        assert_eq!(report.portfolio_series.values, vec![1.0, 1.1, 1.2]);
    }

    #[tokio::test]
    async fn dollar_sizing_is_invariant_to_scale() {
        let engine_small = engine(sample_table(), FixedInflation::Unavailable);
        let engine_big = engine(sample_table(), FixedInflation::Unavailable);

        let small = request(AllocationScheme::new(
            AllocationMode::Dollar,
            vec![600.0, 400.0],
        ));
        let big = request(AllocationScheme::new(
            AllocationMode::Dollar,
            vec![1200.0, 800.0],
        ));

        let report_small = engine_small.run(&small).await.unwrap();
        let report_big = engine_big.run(&big).await.unwrap();

        for (a, b) in report_small
            .portfolio_series
            .values
            .iter()
            .zip(&report_big.portfolio_series.values)
        {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
        assert_relative_eq!(
            report_small.portfolio_return_pct,
            report_big.portfolio_return_pct,
            max_relative = 1e-12
        );
    }

    #[tokio::test]
    async fn annualized_equals_total_over_365_days() {
        let dates = vec![date(2020, 1, 2), date(2020, 6, 1), date(2020, 12, 30)];
        let close = HashMap::from([
            ("AAPL".to_string(), vec![100.0, 120.0, 150.0]),
            ("SPY".to_string(), vec![100.0, 120.0, 150.0]),
        ]);
        let table = PriceTable {
            dates,
            adj_close: close.clone(),
            close,
        };
        let engine = engine(table, FixedInflation::Unavailable);

        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![100.0],
        ));
        req.symbols = vec!["AAPL".to_string()];
        req.start_date = date(2020, 1, 1);
        req.end_date = date(2020, 12, 31); // exactly 365 calendar days

        let report = engine.run(&req).await.unwrap();
        assert_relative_eq!(
            report.portfolio_annualized_return_pct,
            report.portfolio_return_pct,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            report.baseline_annualized_return_pct,
            report.baseline_return_pct,
            max_relative = 1e-9
        );
    }

    #[tokio::test]
    async fn dividends_make_attribution_diverge_from_the_value_series() {
        // Close is flat while adjusted close grows 10%: a pure payout. The
        // reported return follows the adjusted attribution, the plotted
        // series follows close, and the two disagree by design of the
        // original calculation.
        let dates = vec![date(2020, 1, 2), date(2020, 1, 3)];
        let close = HashMap::from([
            ("AAPL".to_string(), vec![100.0, 100.0]),
            ("SPY".to_string(), vec![100.0, 100.0]),
        ]);
        let adj_close = HashMap::from([
            ("AAPL".to_string(), vec![100.0, 110.0]),
            ("SPY".to_string(), vec![100.0, 100.0]),
        ]);
        let table = PriceTable {
            dates,
            close,
            adj_close,
        };
        let engine = engine(table, FixedInflation::Unavailable);

        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![100.0],
        ));
        req.symbols = vec!["AAPL".to_string()];
        let report = engine.run(&req).await.unwrap();

        assert_relative_eq!(report.portfolio_return_pct, 10.0, max_relative = 1e-12);
        let series_implied =
            (report.portfolio_series.last().unwrap() / report.portfolio_series.first().unwrap()
                - 1.0)
                * 100.0;
        assert_relative_eq!(series_implied, 0.0);
        assert!((report.portfolio_return_pct - series_implied).abs() > 1.0);
    }

    #[tokio::test]
    async fn missing_portfolio_symbol_is_an_alignment_error() {
        let engine = engine(sample_table(), FixedInflation::Unavailable);
        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![50.0, 50.0],
        ));
        req.symbols = vec!["AAPL".to_string(), "GONE".to_string()];
        assert!(matches!(
            engine.run(&req).await,
            Err(EngineError::AssetMissingFromFetch(symbol)) if symbol == "GONE"
        ));
    }

    #[tokio::test]
    async fn missing_baseline_is_its_own_error() {
        let engine = engine(sample_table(), FixedInflation::Unavailable);
        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![60.0, 40.0],
        ));
        req.baseline = "VTI".to_string();
        assert!(matches!(
            engine.run(&req).await,
            Err(EngineError::BaselineMissingFromFetch(symbol)) if symbol == "VTI"
        ));
    }

    #[tokio::test]
    async fn empty_fetch_result_is_unavailable() {
        let table = PriceTable {
            dates: vec![],
            close: HashMap::new(),
            adj_close: HashMap::new(),
        };
        let engine = engine(table, FixedInflation::Unavailable);
        let scheme = AllocationScheme::new(AllocationMode::Percentage, vec![60.0, 40.0]);
        assert!(matches!(
            engine.run(&request(scheme)).await,
            Err(EngineError::AssetDataUnavailable)
        ));
    }

    #[tokio::test]
    async fn same_day_range_cannot_be_annualized() {
        let engine = engine(sample_table(), FixedInflation::Unavailable);
        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![60.0, 40.0],
        ));
        req.start_date = date(2020, 1, 2);
        req.end_date = date(2020, 1, 2);
        assert!(matches!(
            engine.run(&req).await,
            Err(EngineError::DivisionByZeroDays)
        ));
    }

    #[tokio::test]
    async fn steady_inflation_deflates_the_series() {
        let points = vec![InflationPoint {
            date: date(2019, 12, 1),
            rate_percent: 2.0,
        }];
        let engine = engine(sample_table(), FixedInflation::Points(points));
        let nominal_engine = engine_nominal();

        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![60.0, 40.0],
        ));
        req.inflation_adjusted = true;
        let real = engine.run(&req).await.unwrap();
        req.inflation_adjusted = false;
        let nominal = nominal_engine.run(&req).await.unwrap();

        assert!(real.inflation_adjusted);
        assert!(real.portfolio_series.last().unwrap() < nominal.portfolio_series.last().unwrap());
        assert!(real.baseline_series.last().unwrap() < nominal.baseline_series.last().unwrap());
    }

    fn engine_nominal() -> BacktestEngine {
        engine(sample_table(), FixedInflation::Unavailable)
    }

    #[tokio::test]
    async fn unavailable_inflation_falls_back_to_nominal() {
        let engine = engine(sample_table(), FixedInflation::Unavailable);
        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![60.0, 40.0],
        ));
        req.inflation_adjusted = true;
        let report = engine.run(&req).await.unwrap();
        assert!(!report.inflation_adjusted);
        assert_eq!(report.portfolio_series.first().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn empty_inflation_payload_also_falls_back_to_nominal() {
        let engine = engine(sample_table(), FixedInflation::Points(vec![]));
        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![60.0, 40.0],
        ));
        req.inflation_adjusted = true;
        let report = engine.run(&req).await.unwrap();
        assert!(!report.inflation_adjusted);
        assert_eq!(report.portfolio_series.first().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn inflation_coverage_gap_is_terminal() {
        // First observation is after the first trading day in the table.
        let points = vec![InflationPoint {
            date: date(2020, 6, 1),
            rate_percent: 2.0,
        }];
        let engine = engine(sample_table(), FixedInflation::Points(points));
        let mut req = request(AllocationScheme::new(
            AllocationMode::Percentage,
            vec![60.0, 40.0],
        ));
        req.inflation_adjusted = true;
        assert!(matches!(
            engine.run(&req).await,
            Err(EngineError::Inflation(InflationError::CoverageGap { .. }))
        ));
    }
}
