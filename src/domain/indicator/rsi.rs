//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100. If there was no movement at all: RSI = 50.
//!
//! Warmup: first n bars unavailable (need n price changes).

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::indicator_helpers::{require_period, wilder_from};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, SignalError> {
    require_period("RSI", "period", period)?;

    let mut gains = vec![0.0; bars.len()];
    let mut losses = vec![0.0; bars.len()];
    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let avg_gain = wilder_from(&gains, 1, period);
    let avg_loss = wilder_from(&losses, 1, period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let value = match (avg_gain[i], avg_loss[i]) {
                (Some(g), Some(l)) => Some(IndicatorValue::Simple(rsi_from_averages(g, l))),
                _ => None,
            };
            IndicatorPoint {
                timestamp: bar.timestamp,
                value,
            }
        })
        .collect();

    Ok(IndicatorSeries {
        kind: IndicatorKind::Rsi,
        values,
    })
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
