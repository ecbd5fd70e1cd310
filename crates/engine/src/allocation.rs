use crate::error::EngineError;
use core_types::{AllocationMode, AllocationScheme};
use std::collections::HashSet;

/// The per-asset rule used to build the portfolio value series. The two
/// modes construct value differently and stay distinct: percentage weights
/// multiply the close price directly, dollar shares scale the close price
/// into a position value.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionSizing {
    Weights(Vec<f64>),
    Shares(Vec<f64>),
}

/// Validates a scheme against the requested portfolio symbols and resolves
/// the canonical per-asset weights used for return attribution.
pub fn attribution_weights(
    symbols: &[String],
    scheme: &AllocationScheme,
) -> Result<Vec<f64>, EngineError> {
    let mut seen = HashSet::new();
    for symbol in symbols {
        if !seen.insert(symbol.as_str()) {
            return Err(EngineError::DuplicateSymbol(symbol.clone()));
        }
    }

    if scheme.amounts.len() != symbols.len() {
        return Err(EngineError::AllocationCountMismatch {
            expected: symbols.len(),
            actual: scheme.amounts.len(),
        });
    }

    match scheme.mode {
        AllocationMode::Percentage => {
            let sum = scheme.total();
            // Exact equality on purpose: 33.33 + 33.33 + 33.34 passes, but a
            // sum that is off by any representable amount is rejected.
            if sum != 100.0 {
                return Err(EngineError::AllocationSumInvalid { sum });
            }
            Ok(scheme.amounts.iter().map(|a| a / 100.0).collect())
        }
        AllocationMode::Dollar => {
            for (symbol, amount) in symbols.iter().zip(&scheme.amounts) {
                if !(*amount > 0.0) {
                    return Err(EngineError::AllocationAmountInvalid {
                        symbol: symbol.clone(),
                        amount: *amount,
                    });
                }
            }
            let total = scheme.total();
            Ok(scheme.amounts.iter().map(|a| a / total).collect())
        }
    }
}

/// Resolves the position sizing rule for the value series. Dollar mode buys
/// a fixed share count at the first trading day's unadjusted close and holds
/// it for the whole period.
pub fn position_sizing(
    scheme: &AllocationScheme,
    weights: &[f64],
    first_closes: &[f64],
) -> PositionSizing {
    match scheme.mode {
        AllocationMode::Percentage => PositionSizing::Weights(weights.to_vec()),
        AllocationMode::Dollar => PositionSizing::Shares(
            scheme
                .amounts
                .iter()
                .zip(first_closes)
                .map(|(amount, close)| amount / close)
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn percentage_weights_sum_to_one() {
        let scheme = AllocationScheme::new(AllocationMode::Percentage, vec![60.0, 40.0]);
        let weights = attribution_weights(&symbols(&["AAPL", "MSFT"]), &scheme).unwrap();
        assert_eq!(weights, vec![0.6, 0.4]);
        assert_relative_eq!(weights.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn percentage_sum_must_be_exactly_100() {
        let scheme = AllocationScheme::new(AllocationMode::Percentage, vec![50.0, 60.0]);
        match attribution_weights(&symbols(&["AAPL", "MSFT"]), &scheme) {
            Err(EngineError::AllocationSumInvalid { sum }) => assert_eq!(sum, 110.0),
            other => panic!("expected AllocationSumInvalid, got {other:?}"),
        }
    }

    #[test]
    fn uneven_thirds_that_sum_exactly_pass() {
        let scheme =
            AllocationScheme::new(AllocationMode::Percentage, vec![33.33, 33.33, 33.34]);
        assert!(attribution_weights(&symbols(&["A", "B", "C"]), &scheme).is_ok());
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let scheme = AllocationScheme::new(AllocationMode::Percentage, vec![100.0]);
        assert!(matches!(
            attribution_weights(&symbols(&["AAPL", "MSFT"]), &scheme),
            Err(EngineError::AllocationCountMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let scheme = AllocationScheme::new(AllocationMode::Percentage, vec![50.0, 50.0]);
        assert!(matches!(
            attribution_weights(&symbols(&["AAPL", "AAPL"]), &scheme),
            Err(EngineError::DuplicateSymbol(_))
        ));
    }

    #[test]
    fn dollar_weights_are_fractions_of_total() {
        let scheme = AllocationScheme::new(AllocationMode::Dollar, vec![1500.0, 500.0]);
        let weights = attribution_weights(&symbols(&["AAPL", "MSFT"]), &scheme).unwrap();
        assert_eq!(weights, vec![0.75, 0.25]);
    }

    #[test]
    fn dollar_amounts_must_be_positive() {
        let scheme = AllocationScheme::new(AllocationMode::Dollar, vec![1000.0, -50.0]);
        assert!(matches!(
            attribution_weights(&symbols(&["AAPL", "MSFT"]), &scheme),
            Err(EngineError::AllocationAmountInvalid { .. })
        ));
    }

    #[test]
    fn dollar_sizing_buys_shares_at_first_close() {
        let scheme = AllocationScheme::new(AllocationMode::Dollar, vec![1000.0]);
        let weights = attribution_weights(&symbols(&["AAPL"]), &scheme).unwrap();
        let sizing = position_sizing(&scheme, &weights, &[100.0]);
        assert_eq!(sizing, PositionSizing::Shares(vec![10.0]));
    }

    #[test]
    fn percentage_sizing_reuses_the_weights() {
        let scheme = AllocationScheme::new(AllocationMode::Percentage, vec![60.0, 40.0]);
        let weights = attribution_weights(&symbols(&["AAPL", "MSFT"]), &scheme).unwrap();
        let sizing = position_sizing(&scheme, &weights, &[100.0, 200.0]);
        assert_eq!(sizing, PositionSizing::Weights(weights));
    }
}
