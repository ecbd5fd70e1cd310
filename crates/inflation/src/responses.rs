use crate::error::InflationError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// One periodic observation as the StatBureau API reports it. The feed is
/// monthly in practice but the cadence is not guaranteed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InflationRecord {
    pub country: Option<String>,
    /// Reported as an ISO datetime string, e.g. "2023-01-01T00:00:00".
    pub date: String,
    /// Percent per period, not a decimal fraction.
    pub inflation_rate: f64,
}

impl InflationRecord {
    pub fn parse_date(&self) -> Result<NaiveDate, InflationError> {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&self.date, "%Y-%m-%dT%H:%M:%S") {
            return Ok(datetime.date());
        }
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|e| {
            InflationError::Deserialization(format!("Invalid observation date '{}': {}", self.date, e))
        })
    }
}
