use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the raw allocation values attached to a portfolio are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
    /// Raw values are percentages of the portfolio and must sum to 100.
    Percentage,
    /// Raw values are dollar amounts invested on the first trading day.
    Dollar,
}

impl FromStr for AllocationMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" => Ok(AllocationMode::Percentage),
            "dollar" => Ok(AllocationMode::Dollar),
            other => Err(CoreError::InvalidAllocationMode(other.to_string())),
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationMode::Percentage => write!(f, "percentage"),
            AllocationMode::Dollar => write!(f, "dollar"),
        }
    }
}
