use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InflationError {
    #[error("Failed to build or send the HTTP request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to deserialize the inflation response: {0}")]
    Deserialization(String),

    #[error("inflation data source returned no observations")]
    DataUnavailable,

    #[error("inflation data begins {first_available}, after the requested start {requested}")]
    CoverageGap {
        requested: NaiveDate,
        first_available: NaiveDate,
    },

    #[error("no inflation factor available for {date}")]
    Alignment { date: NaiveDate },
}
