use crate::error::ConfigError;
use chrono::NaiveDate;
use core_types::AllocationMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The full set of inputs for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Portfolio tickers, excluding the baseline.
    pub stocks: Vec<String>,
    /// Raw allocation values, one per ticker, interpreted per `allocation_type`.
    pub allocations: Vec<f64>,
    pub allocation_type: AllocationMode,
    /// The single reference ticker the portfolio is compared against.
    pub baseline: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BacktestSettings {
    /// Loads settings from a flat `key:value` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parses the flat file format. Unknown keys are ignored so older files
    /// keep loading after new keys are introduced.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ConfigError::MalformedLine(line.to_string()))?;
            fields.insert(key.trim(), value.trim());
        }

        let stocks = split_list(require(&fields, "stocks")?);
        let allocations = split_list(require(&fields, "allocations")?)
            .iter()
            .map(|a| {
                a.parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                    key: "allocations",
                    value: a.clone(),
                })
            })
            .collect::<Result<Vec<f64>, ConfigError>>()?;
        let mode_raw = require(&fields, "allocation_type")?;
        let allocation_type =
            mode_raw
                .parse::<AllocationMode>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "allocation_type",
                    value: mode_raw.to_string(),
                })?;
        let baseline = require(&fields, "baseline")?.to_string();
        let start_date = parse_date(&fields, "start_date")?;
        let end_date = parse_date(&fields, "end_date")?;

        Ok(Self {
            stocks,
            allocations,
            allocation_type,
            baseline,
            start_date,
            end_date,
        })
    }

    /// Writes the settings in the flat `key:value` format, preserving the
    /// historical field order.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_file_format())?;
        Ok(())
    }

    pub fn to_file_format(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "stocks:{}", self.stocks.join(","));
        let allocations: Vec<String> = self.allocations.iter().map(|a| a.to_string()).collect();
        let _ = writeln!(out, "allocations:{}", allocations.join(","));
        let _ = writeln!(out, "allocation_type:{}", self.allocation_type);
        let _ = writeln!(out, "baseline:{}", self.baseline);
        let _ = writeln!(out, "start_date:{}", self.start_date.format(DATE_FORMAT));
        let _ = writeln!(out, "end_date:{}", self.end_date.format(DATE_FORMAT));
        out
    }
}

fn require<'a>(
    fields: &HashMap<&'a str, &'a str>,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    fields.get(key).copied().ok_or(ConfigError::MissingKey(key))
}

fn parse_date(fields: &HashMap<&str, &str>, key: &'static str) -> Result<NaiveDate, ConfigError> {
    let value = require(fields, key)?;
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
