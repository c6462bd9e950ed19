//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars unavailable.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::indicator_helpers::{closes, require_period, sma_from};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, SignalError> {
    require_period("SMA", "period", period)?;

    let averages = sma_from(&closes(bars), 0, period);
    let values = bars
        .iter()
        .zip(averages)
        .map(|(bar, avg)| IndicatorPoint {
            timestamp: bar.timestamp,
            value: avg.map(IndicatorValue::Simple),
        })
        .collect();

    Ok(IndicatorSeries {
        kind: IndicatorKind::Sma,
        values,
    })
}
