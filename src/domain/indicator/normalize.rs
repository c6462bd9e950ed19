//! Directional contribution of one indicator reading.
//!
//! Maps a raw indicator value on a bar to a score in [-1, 1] where positive
//! is bullish. Each family has one fixed rule:
//!
//! | Indicator  | Contribution                                              |
//! |------------|-----------------------------------------------------------|
//! | SMA / EMA  | clamp(((close - ma) / ma) / saturation)                   |
//! | RSI        | (50 - rsi) / 50                                           |
//! | Stochastic | (50 - %D) / 50                                            |
//! | MACD       | clamp(histogram / (saturation × close))                   |
//! | Bollinger  | clamp(1 - 2 × %B), 0 on a zero-width band                 |
//! | ADX        | ((+DI - -DI) / (+DI + -DI)) × clamp(ADX / 50, 0, 1)       |
//! | ROC        | clamp(roc / saturation)                                   |

use super::{IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

/// ADX at or above this level counts as a fully developed trend.
const ADX_FULL_TREND: f64 = 50.0;

fn clamp_unit(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn contribution(indicator: &IndicatorType, bar: &PriceBar, value: &IndicatorValue) -> f64 {
    let raw = match (indicator, value) {
        (IndicatorType::Sma { saturation, .. }, IndicatorValue::Simple(ma))
        | (IndicatorType::Ema { saturation, .. }, IndicatorValue::Simple(ma)) => {
            ratio(ratio(bar.close - ma, *ma), *saturation)
        }
        (IndicatorType::Rsi { .. }, IndicatorValue::Simple(rsi)) => (50.0 - rsi) / 50.0,
        (IndicatorType::Stochastic { .. }, IndicatorValue::Stochastic { d, .. }) => {
            (50.0 - d) / 50.0
        }
        (IndicatorType::Macd { saturation, .. }, IndicatorValue::Macd { histogram, .. }) => {
            ratio(*histogram, saturation * bar.close)
        }
        (
            IndicatorType::Bollinger { .. },
            IndicatorValue::Bollinger { upper, lower, .. },
        ) => {
            let width = upper - lower;
            if width <= 0.0 {
                0.0
            } else {
                let percent_b = (bar.close - lower) / width;
                1.0 - 2.0 * percent_b
            }
        }
        (
            IndicatorType::Adx { .. },
            IndicatorValue::Adx {
                adx,
                plus_di,
                minus_di,
            },
        ) => {
            let direction = ratio(plus_di - minus_di, plus_di + minus_di);
            direction * (adx / ADX_FULL_TREND).clamp(0.0, 1.0)
        }
        (IndicatorType::Roc { saturation, .. }, IndicatorValue::Simple(roc)) => {
            ratio(*roc, *saturation)
        }
        _ => 0.0,
    };
    clamp_unit(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(close: f64) -> PriceBar {
        PriceBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn moving_average_scaled_by_saturation() {
        let sma = IndicatorType::Sma {
            period: 20,
            saturation: 0.02,
        };
        // close 1% above the average, half of saturation
        let c = contribution(&sma, &bar(101.0), &IndicatorValue::Simple(100.0));
        assert!((c - 0.5).abs() < 1e-12);
        let c = contribution(&sma, &bar(90.0), &IndicatorValue::Simple(100.0));
        assert_eq!(c, -1.0);
    }

    #[test]
    fn moving_average_at_zero_is_neutral() {
        let ema = IndicatorType::Ema {
            period: 5,
            saturation: 0.02,
        };
        assert_eq!(
            contribution(&ema, &bar(1.0), &IndicatorValue::Simple(0.0)),
            0.0
        );
    }

    #[test]
    fn rsi_oversold_is_bullish() {
        let rsi = IndicatorType::Rsi { period: 14 };
        assert_eq!(contribution(&rsi, &bar(1.0), &IndicatorValue::Simple(0.0)), 1.0);
        assert_eq!(contribution(&rsi, &bar(1.0), &IndicatorValue::Simple(50.0)), 0.0);
        assert_eq!(
            contribution(&rsi, &bar(1.0), &IndicatorValue::Simple(75.0)),
            -0.5
        );
    }

    #[test]
    fn stochastic_uses_d_line() {
        let stoch = IndicatorType::Stochastic {
            k_period: 14,
            d_period: 3,
        };
        let value = IndicatorValue::Stochastic { k: 0.0, d: 80.0 };
        assert!((contribution(&stoch, &bar(1.0), &value) + 0.6).abs() < 1e-12);
    }

    #[test]
    fn macd_histogram_relative_to_price() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
            saturation: 0.005,
        };
        let value = IndicatorValue::Macd {
            line: 0.0,
            signal: 0.0,
            histogram: 0.25,
        };
        // 0.25 / (0.005 * 100)
        assert!((contribution(&macd, &bar(100.0), &value) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn bollinger_lower_band_is_bullish() {
        let bb = IndicatorType::Bollinger {
            period: 20,
            multiplier: 2.0,
        };
        let bands = IndicatorValue::Bollinger {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        };
        assert_eq!(contribution(&bb, &bar(90.0), &bands), 1.0);
        assert_eq!(contribution(&bb, &bar(100.0), &bands), 0.0);
        assert_eq!(contribution(&bb, &bar(120.0), &bands), -1.0);
    }

    #[test]
    fn bollinger_zero_width_is_neutral() {
        let bb = IndicatorType::Bollinger {
            period: 20,
            multiplier: 2.0,
        };
        let bands = IndicatorValue::Bollinger {
            upper: 100.0,
            middle: 100.0,
            lower: 100.0,
        };
        assert_eq!(contribution(&bb, &bar(100.0), &bands), 0.0);
    }

    #[test]
    fn adx_direction_weighted_by_strength() {
        let adx = IndicatorType::Adx { period: 14 };
        let strong = IndicatorValue::Adx {
            adx: 60.0,
            plus_di: 30.0,
            minus_di: 10.0,
        };
        assert!((contribution(&adx, &bar(1.0), &strong) - 0.5).abs() < 1e-12);
        let weak = IndicatorValue::Adx {
            adx: 25.0,
            plus_di: 10.0,
            minus_di: 30.0,
        };
        assert!((contribution(&adx, &bar(1.0), &weak) + 0.25).abs() < 1e-12);
        let none = IndicatorValue::Adx {
            adx: 0.0,
            plus_di: 0.0,
            minus_di: 0.0,
        };
        assert_eq!(contribution(&adx, &bar(1.0), &none), 0.0);
    }

    #[test]
    fn roc_saturates() {
        let roc = IndicatorType::Roc {
            period: 1,
            saturation: 31.25,
        };
        let c = contribution(&roc, &bar(125.0), &IndicatorValue::Simple(25.0));
        assert!((c - 0.8).abs() < 1e-12);
        let c = contribution(&roc, &bar(1.0), &IndicatorValue::Simple(-100.0));
        assert_eq!(c, -1.0);
    }

    #[test]
    fn mismatched_value_shape_is_neutral() {
        let rsi = IndicatorType::Rsi { period: 14 };
        let value = IndicatorValue::Stochastic { k: 0.0, d: 0.0 };
        assert_eq!(contribution(&rsi, &bar(1.0), &value), 0.0);
    }
}
