use core_types::CoreError;
use inflation::error::InflationError;
use market_data::error::MarketDataError;
use thiserror::Error;

/// Every way a backtest run can fail. A run returns exactly one terminal
/// error and never a partial result.
#[derive(Error, Debug)]
pub enum EngineError {
    // --- Input validation ---
    #[error("number of allocations ({actual}) must match number of portfolio assets ({expected})")]
    AllocationCountMismatch { expected: usize, actual: usize },

    #[error("duplicate portfolio symbol: {0}")]
    DuplicateSymbol(String),

    #[error("percentage allocations must sum to exactly 100, got {sum}")]
    AllocationSumInvalid { sum: f64 },

    #[error("dollar allocation for {symbol} must be positive, got {amount}")]
    AllocationAmountInvalid { symbol: String, amount: f64 },

    // --- Data fetch ---
    #[error("market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("inflation data error: {0}")]
    Inflation(#[from] InflationError),

    // --- Data alignment ---
    #[error("no price data available for the requested symbols and date range")]
    AssetDataUnavailable,

    #[error("no price data returned for portfolio asset {0}")]
    AssetMissingFromFetch(String),

    #[error("no price data returned for baseline asset {0}")]
    BaselineMissingFromFetch(String),

    // --- Computation ---
    #[error("start and end date are the same day; annualized return is undefined")]
    DivisionByZeroDays,

    #[error("cannot annualize a negative growth ratio ({ratio})")]
    InvalidExponent { ratio: f64 },

    #[error("series error: {0}")]
    Core(#[from] CoreError),
}
