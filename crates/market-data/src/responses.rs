use serde::Deserialize;

// The chart endpoint wraps everything in a `chart` envelope that carries
// either a result array or an error object, never both.

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartApiError>,
}

/// The provider's symbol-level error object (e.g. "Not Found" for a
/// delisted or misspelled ticker).
#[derive(Debug, Clone, Deserialize)]
pub struct ChartApiError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    /// Unix timestamps (seconds) of the returned trading days. Absent when
    /// the range contains no data.
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    pub quote: Vec<QuoteBlock>,
    /// Present when the request asked for dividend/split events.
    pub adjclose: Option<Vec<AdjCloseBlock>>,
}

/// Price cells are nullable; the provider emits `null` for days a symbol
/// did not trade.
#[derive(Debug, Deserialize)]
pub struct QuoteBlock {
    pub close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjCloseBlock {
    pub adjclose: Option<Vec<Option<f64>>>,
}
