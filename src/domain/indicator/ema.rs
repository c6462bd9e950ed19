//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars unavailable.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::indicator_helpers::{closes, ema_from, require_period};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, SignalError> {
    require_period("EMA", "period", period)?;

    let ema = ema_from(&closes(bars), 0, period);
    let values = bars
        .iter()
        .zip(ema)
        .map(|(bar, v)| IndicatorPoint {
            timestamp: bar.timestamp,
            value: v.map(IndicatorValue::Simple),
        })
        .collect();

    Ok(IndicatorSeries {
        kind: IndicatorKind::Ema,
        values,
    })
}
