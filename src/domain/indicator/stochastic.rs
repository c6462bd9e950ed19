//! Stochastic oscillator.
//!
//! %K(k) = 100 × (C - LL(k)) / (HH(k) - LL(k)); 50 when HH == LL.
//! %D(d) = SMA(d) of %K.
//! Warmup: (k-1) + (d-1) bars unavailable.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::indicator_helpers::{require_period, sma_from};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_stochastic(
    bars: &[PriceBar],
    k_period: usize,
    d_period: usize,
) -> Result<IndicatorSeries, SignalError> {
    require_period("STOCHASTIC", "k_period", k_period)?;
    require_period("STOCHASTIC", "d_period", d_period)?;

    let k_start = k_period - 1;
    let mut k_line = vec![0.0; bars.len()];
    for i in k_start..bars.len() {
        let window = &bars[i + 1 - k_period..=i];
        let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let range = highest - lowest;
        k_line[i] = if range > 0.0 {
            100.0 * (bars[i].close - lowest) / range
        } else {
            50.0
        };
    }

    let d_line = sma_from(&k_line, k_start, d_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            timestamp: bar.timestamp,
            value: d_line[i].map(|d| IndicatorValue::Stochastic { k: k_line[i], d }),
        })
        .collect();

    Ok(IndicatorSeries {
        kind: IndicatorKind::Stochastic,
        values,
    })
}
