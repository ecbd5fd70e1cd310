//! # Meridian Inflation
//!
//! The inflation data collaborator and the deflation pass that turns nominal
//! value series into real terms.
//!
//! The abstract [`InflationDataClient`] fetches a periodic (usually monthly)
//! inflation-rate series for a country; [`StatBureauClient`] is the concrete
//! implementation. [`daily_cumulative_factors`] resamples that series to
//! daily granularity and compounds it into a cumulative multiplier, and
//! [`deflate`] divides a nominal series by it.

use crate::error::InflationError;
use crate::responses::InflationRecord;
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod error;
pub mod factors;
pub mod responses;

// Re-export the key components to create a clean, public-facing API.
pub use factors::{daily_cumulative_factors, deflate};

/// One periodic inflation observation: the percent rate reported for the
/// period beginning at `date`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InflationPoint {
    pub date: NaiveDate,
    pub rate_percent: f64,
}

/// The generic, abstract interface for an inflation data source, allowing
/// the underlying implementation (live or mock) to be swapped out.
#[async_trait]
pub trait InflationDataClient: Send + Sync {
    /// Fetches the full periodic inflation-rate history for `country`.
    /// An empty result means the source has no data for that country.
    async fn fetch_inflation(&self, country: &str) -> Result<Vec<InflationPoint>, InflationError>;
}

/// A concrete [`InflationDataClient`] backed by the StatBureau JSON API.
#[derive(Clone)]
pub struct StatBureauClient {
    client: reqwest::Client,
    base_url: String,
}

impl StatBureauClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://www.statbureau.org".to_string(),
        }
    }
}

impl Default for StatBureauClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InflationDataClient for StatBureauClient {
    async fn fetch_inflation(&self, country: &str) -> Result<Vec<InflationPoint>, InflationError> {
        let url = format!("{}/get-data-json", self.base_url);
        let records = self
            .client
            .get(&url)
            .query(&[("country", country)])
            .send()
            .await?
            .json::<Vec<InflationRecord>>()
            .await?;

        let mut points = Vec::with_capacity(records.len());
        for record in &records {
            points.push(InflationPoint {
                date: record.parse_date()?,
                rate_percent: record.inflation_rate,
            });
        }

        tracing::info!(
            "Fetched {} inflation observations for {}",
            points.len(),
            country
        );
        Ok(points)
    }
}
