//! # Meridian Configuration
//!
//! Save and load of backtest run configurations. The on-disk format is a flat
//! text file of `key:value` lines with the keys `stocks`, `allocations`,
//! `allocation_type`, `baseline`, `start_date` and `end_date`, dates in
//! `YYYY-MM-DD`. The format is fixed; other tooling reads the same files.

pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::BacktestSettings;
