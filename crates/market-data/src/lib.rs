//! # Meridian Market Data
//!
//! The price series provider. Exposes the abstract [`PriceDataClient`]
//! interface the valuation engine depends on, plus [`YahooChartClient`], a
//! concrete implementation backed by the Yahoo Finance chart API.
//!
//! Per-symbol downloads run concurrently; the results are outer-joined into a
//! single [`PriceTable`] whose date index is the union of every symbol's
//! trading days. Days a symbol did not trade are padded with NaN rather than
//! re-aligned, so gaps flow through to the consumer unchanged.

use crate::error::MarketDataError;
use crate::responses::ChartEnvelope;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use core_types::PriceTable;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::collections::{BTreeSet, HashMap, HashSet};

pub mod error;
pub mod responses;

// --- Public API ---
pub use responses::ChartApiError;

/// The generic, abstract interface for a daily price data provider.
/// This trait is the contract the engine uses, allowing the underlying
/// implementation (live or mock) to be swapped out.
#[async_trait]
pub trait PriceDataClient: Send + Sync {
    /// Fetches daily close and adjusted-close series for every symbol over
    /// `[start, end]` and joins them into one table.
    ///
    /// A symbol the provider knows nothing about is omitted from the table's
    /// columns rather than failing the whole call; transport failures fail
    /// the call.
    async fn fetch_daily_prices(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, MarketDataError>;
}

/// One symbol's raw series before the join.
struct SymbolSeries {
    dates: Vec<NaiveDate>,
    close: Vec<f64>,
    adj_close: Vec<f64>,
}

/// A concrete [`PriceDataClient`] backed by the Yahoo Finance v8 chart API.
#[derive(Clone)]
pub struct YahooChartClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn new() -> Self {
        // The chart endpoint rejects requests without a browser user agent.
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0 Safari/537.36",
            ),
        );

        Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .build()
                .expect("Failed to build reqwest client"),
            base_url: "https://query1.finance.yahoo.com".to_string(),
        }
    }

    /// Fetches a single symbol's daily bars. Returns `Ok(None)` when the
    /// provider reports a symbol-level error or has no rows in the range, so
    /// the caller can leave that column out of the join.
    async fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<SymbolSeries>, MarketDataError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "div|split".to_string()),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // Symbol-level failures come back as an error envelope, usually with
        // a non-success status. Only treat the body as unreadable when it is
        // neither a result nor an error object.
        let envelope: ChartEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(MarketDataError::Api(format!(
                    "HTTP {status} fetching {symbol}"
                )));
            }
            Err(e) => return Err(MarketDataError::Deserialization(e.to_string())),
        };

        if let Some(error) = envelope.chart.error {
            tracing::warn!(
                "No chart data for {}: {} ({})",
                symbol,
                error.description,
                error.code
            );
            return Ok(None);
        }

        let Some(result) = envelope
            .chart
            .result
            .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
        else {
            return Ok(None);
        };
        let Some(timestamps) = result.timestamp else {
            // No trading days in the requested range.
            return Ok(None);
        };

        let mut dates = Vec::with_capacity(timestamps.len());
        for ts in &timestamps {
            let date = DateTime::from_timestamp(*ts, 0)
                .ok_or_else(|| {
                    MarketDataError::InvalidData(format!("Invalid timestamp {ts} for {symbol}"))
                })?
                .date_naive();
            dates.push(date);
        }

        let quote = result.indicators.quote.into_iter().next().ok_or_else(|| {
            MarketDataError::InvalidData(format!("Missing quote block for {symbol}"))
        })?;
        let close_raw = quote.close.unwrap_or_default();
        let close: Vec<f64> = (0..dates.len())
            .map(|i| close_raw.get(i).copied().flatten().unwrap_or(f64::NAN))
            .collect();

        let adj_raw = result
            .indicators
            .adjclose
            .and_then(|mut blocks| (!blocks.is_empty()).then(|| blocks.remove(0)))
            .and_then(|block| block.adjclose);
        let adj_close: Vec<f64> = match adj_raw {
            Some(raw) => (0..dates.len())
                .map(|i| raw.get(i).copied().flatten().unwrap_or(f64::NAN))
                .collect(),
            // Some instruments never pay out; the provider then omits the
            // adjusted block and close is already the adjusted value.
            None => close.clone(),
        };

        Ok(Some(SymbolSeries {
            dates,
            close,
            adj_close,
        }))
    }
}

impl Default for YahooChartClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceDataClient for YahooChartClient {
    async fn fetch_daily_prices(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, MarketDataError> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = symbols.iter().filter(|s| seen.insert(s.as_str())).collect();

        tracing::info!(
            "Fetching daily prices for {} symbols from {} to {}",
            unique.len(),
            start,
            end
        );

        let fetches = unique.iter().map(|s| self.fetch_symbol(s, start, end));
        let results = join_all(fetches).await;

        let mut columns = Vec::new();
        for (symbol, result) in unique.into_iter().zip(results) {
            if let Some(series) = result? {
                columns.push((symbol.clone(), series));
            }
        }

        Ok(join_symbol_series(columns))
    }
}

/// Outer-joins per-symbol series on the union of their dates. Cells a symbol
/// has no bar for are NaN, matching how a column-wise frame join behaves.
fn join_symbol_series(columns: Vec<(String, SymbolSeries)>) -> PriceTable {
    let mut all_dates: BTreeSet<NaiveDate> = BTreeSet::new();
    for (_, series) in &columns {
        all_dates.extend(series.dates.iter().copied());
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();
    let index: HashMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut close = HashMap::new();
    let mut adj_close = HashMap::new();
    for (symbol, series) in columns {
        let mut close_col = vec![f64::NAN; dates.len()];
        let mut adj_col = vec![f64::NAN; dates.len()];
        for (i, date) in series.dates.iter().enumerate() {
            let j = index[date];
            close_col[j] = series.close[i];
            adj_col[j] = series.adj_close[i];
        }
        close.insert(symbol.clone(), close_col);
        adj_close.insert(symbol, adj_col);
    }

    PriceTable {
        dates,
        close,
        adj_close,
    }
}
