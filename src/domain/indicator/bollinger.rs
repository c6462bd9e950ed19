//! Bollinger Bands indicator.
//!
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N).
//! Warmup: first (period-1) bars unavailable.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::indicator_helpers::require_period;
use crate::domain::ohlcv::PriceBar;

pub fn calculate_bollinger(
    bars: &[PriceBar],
    period: usize,
    multiplier: f64,
) -> Result<IndicatorSeries, SignalError> {
    require_period("BOLLINGER", "period", period)?;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(SignalError::invalid_parameter(
            "BOLLINGER",
            "multiplier",
            "must be a positive number",
        ));
    }

    let warmup = period - 1;
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let value = if i >= warmup {
            let window = &bars[i + 1 - period..=i];
            let middle: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
            let variance: f64 = window
                .iter()
                .map(|b| {
                    let diff = b.close - middle;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            let band = multiplier * variance.sqrt();

            Some(IndicatorValue::Bollinger {
                upper: middle + band,
                middle,
                lower: middle - band,
            })
        } else {
            None
        };

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            value,
        });
    }

    Ok(IndicatorSeries {
        kind: IndicatorKind::Bollinger,
        values,
    })
}
