//! Shared helper functions for indicator calculations.

use crate::domain::error::SignalError;
use crate::domain::ohlcv::PriceBar;

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn require_period(indicator: &str, name: &str, period: usize) -> Result<(), SignalError> {
    if period == 0 {
        return Err(SignalError::invalid_parameter(
            indicator,
            name,
            "must be at least 1",
        ));
    }
    Ok(())
}

/// Simple moving average over `values[start..]`.
///
/// Output is aligned with `values`; positions before `start + period - 1`
/// are `None`.
pub fn sma_from(values: &[f64], start: usize, period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    let mut sum = 0.0;
    for i in start..values.len() {
        sum += values[i];
        if i >= start + period {
            sum -= values[i - period];
        }
        if i + 1 >= start + period {
            out[i] = Some(sum / period as f64);
        }
    }
    out
}

/// Exponential moving average over `values[start..]`, seeded with the SMA
/// of the first `period` values. k = 2/(n+1).
pub fn ema_from(values: &[f64], start: usize, period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed_index = start + period - 1;
    let mut sum = 0.0;
    let mut ema = 0.0;

    for i in start..values.len() {
        if i < seed_index {
            sum += values[i];
        } else if i == seed_index {
            sum += values[i];
            ema = sum / period as f64;
            out[i] = Some(ema);
        } else {
            ema = values[i] * k + ema * (1.0 - k);
            out[i] = Some(ema);
        }
    }
    out
}

/// Wilder's smoothing: seed with the mean of the first `period` values of
/// `values[start..]`, then avg = (prev * (n-1) + x) / n.
pub fn wilder_from(values: &[f64], start: usize, period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    let seed_index = start + period - 1;
    let mut sum = 0.0;
    let mut avg = 0.0;

    for i in start..values.len() {
        if i < seed_index {
            sum += values[i];
        } else if i == seed_index {
            sum += values[i];
            avg = sum / period as f64;
            out[i] = Some(avg);
        } else {
            avg = (avg * (period - 1) as f64 + values[i]) / period as f64;
            out[i] = Some(avg);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_from_warmup_and_values() {
        let out = sma_from(&[1.0, 2.0, 3.0, 4.0, 5.0], 0, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 2.0).abs() < 1e-12);
        assert!((out[3].unwrap() - 3.0).abs() < 1e-12);
        assert!((out[4].unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn sma_from_offset_start() {
        let out = sma_from(&[0.0, 0.0, 10.0, 20.0, 30.0], 2, 2);
        assert!(out[..3].iter().all(Option::is_none));
        assert!((out[3].unwrap() - 15.0).abs() < 1e-12);
        assert!((out[4].unwrap() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn ema_from_seed_is_sma() {
        let out = ema_from(&[10.0, 20.0, 30.0, 40.0], 0, 3);
        assert!((out[2].unwrap() - 20.0).abs() < 1e-12);
        // k = 0.5: 40*0.5 + 20*0.5
        assert!((out[3].unwrap() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn wilder_from_smoothing() {
        let out = wilder_from(&[10.0, 10.0, 10.0, 13.0], 0, 3);
        assert!((out[2].unwrap() - 10.0).abs() < 1e-12);
        // (10*2 + 13) / 3 = 11
        assert!((out[3].unwrap() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn short_input_yields_no_values() {
        assert!(ema_from(&[1.0, 2.0], 0, 5).iter().all(Option::is_none));
        assert!(wilder_from(&[], 0, 5).is_empty());
    }

    #[test]
    fn require_period_rejects_zero() {
        assert!(require_period("SMA", "period", 0).is_err());
        assert!(require_period("SMA", "period", 1).is_ok());
    }
}
