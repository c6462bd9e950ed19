//! Price bar representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::SignalError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Checks that timestamps are strictly increasing, prices are finite, each
/// bar's open and close lie within [low, high], and volume is non-negative.
///
/// Gaps between bars are legal; they are real data sparsity and are never
/// padded.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), SignalError> {
    for (i, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close, bar.volume];
        if prices.iter().any(|v| !v.is_finite()) {
            return Err(SignalError::Data {
                reason: format!("non-finite value in bar {} ({})", i, bar.timestamp),
            });
        }
        if bar.low > bar.high {
            return Err(SignalError::Data {
                reason: format!(
                    "low {} above high {} in bar {} ({})",
                    bar.low, bar.high, i, bar.timestamp
                ),
            });
        }
        let range = bar.low..=bar.high;
        if !range.contains(&bar.open) || !range.contains(&bar.close) {
            return Err(SignalError::Data {
                reason: format!(
                    "open/close outside [{}, {}] in bar {} ({})",
                    bar.low, bar.high, i, bar.timestamp
                ),
            });
        }
        if bar.volume < 0.0 {
            return Err(SignalError::Data {
                reason: format!("negative volume in bar {} ({})", i, bar.timestamp),
            });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(SignalError::Data {
                reason: format!(
                    "timestamps not strictly increasing at bar {} ({} after {})",
                    i,
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}
