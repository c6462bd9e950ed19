//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::indicator_helpers::{closes, ema_from, require_period};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<IndicatorSeries, SignalError> {
    require_period("MACD", "fast", fast)?;
    require_period("MACD", "slow", slow)?;
    require_period("MACD", "signal", signal_period)?;
    if fast >= slow {
        return Err(SignalError::invalid_parameter(
            "MACD",
            "fast",
            "must be shorter than slow",
        ));
    }

    let prices = closes(bars);
    let ema_fast = ema_from(&prices, 0, fast);
    let ema_slow = ema_from(&prices, 0, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => f - s,
            _ => 0.0,
        })
        .collect();

    // The line is defined from slow-1 on; the signal EMA starts there.
    let signal_line = ema_from(&macd_line, slow - 1, signal_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            timestamp: bar.timestamp,
            value: signal_line[i].map(|signal| IndicatorValue::Macd {
                line: macd_line[i],
                signal,
                histogram: macd_line[i] - signal,
            }),
        })
        .collect();

    Ok(IndicatorSeries {
        kind: IndicatorKind::Macd,
        values,
    })
}

pub fn calculate_macd_default(bars: &[PriceBar]) -> Result<IndicatorSeries, SignalError> {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn histogram(point: &IndicatorPoint) -> Option<f64> {
        match point.value {
            Some(IndicatorValue::Macd { histogram, .. }) => Some(histogram),
            _ => None,
        }
    }

    #[test]
    fn macd_warmup() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&prices);
        let series = calculate_macd_default(&bars).unwrap();

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        assert!(!series.values[warmup - 1].is_available());
        assert!(series.values[warmup].is_available());
    }

    #[test]
    fn macd_constant_prices_is_zero() {
        let bars = make_bars(&[50.0; 40]);
        let series = calculate_macd_default(&bars).unwrap();
        let last = series.values.last().unwrap();
        match last.value {
            Some(IndicatorValue::Macd {
                line,
                signal,
                histogram,
            }) => {
                assert!(line.abs() < 1e-10);
                assert!(signal.abs() < 1e-10);
                assert!(histogram.abs() < 1e-10);
            }
            _ => panic!("Expected MACD value"),
        }
    }

    #[test]
    fn macd_uptrend_has_positive_line() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64) * 1.5).collect();
        let bars = make_bars(&prices);
        let series = calculate_macd(&bars, 3, 6, 3).unwrap();
        match series.values.last().unwrap().value {
            Some(IndicatorValue::Macd { line, .. }) => assert!(line > 0.0),
            _ => panic!("Expected MACD value"),
        }
    }

    #[test]
    fn macd_accelerating_uptrend_has_positive_histogram() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).powi(2) * 0.1).collect();
        let bars = make_bars(&prices);
        let series = calculate_macd(&bars, 3, 6, 3).unwrap();
        assert!(histogram(series.values.last().unwrap()).unwrap() > 0.0);
    }

    #[test]
    fn macd_rejects_fast_not_below_slow() {
        let bars = make_bars(&[1.0; 10]);
        assert!(matches!(
            calculate_macd(&bars, 5, 5, 3),
            Err(SignalError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn macd_rejects_zero_signal() {
        let bars = make_bars(&[1.0; 10]);
        assert!(calculate_macd(&bars, 2, 5, 0).is_err());
    }
}
