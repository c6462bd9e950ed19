//! ROC (Rate of Change) indicator.
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: ROC = 0
//! Warmup: first n bars unavailable.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::indicator_helpers::require_period;
use crate::domain::ohlcv::PriceBar;

pub fn calculate_roc(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, SignalError> {
    require_period("ROC", "period", period)?;

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let value = if i >= period {
            let prev_close = bars[i - period].close;
            let roc = if prev_close == 0.0 {
                0.0
            } else {
                ((bar.close - prev_close) / prev_close) * 100.0
            };
            Some(IndicatorValue::Simple(roc))
        } else {
            None
        };

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            value,
        });
    }

    Ok(IndicatorSeries {
        kind: IndicatorKind::Roc,
        values,
    })
}
