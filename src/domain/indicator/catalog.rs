//! Static indicator catalog.
//!
//! One descriptor per `IndicatorKind` listing the named numeric parameters it
//! accepts, with defaults and valid ranges. Adding an indicator means adding
//! a variant and a descriptor here; the signal engine is untouched.

use std::collections::BTreeMap;

use super::IndicatorKind;
use crate::domain::error::SignalError;

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub integer: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct IndicatorDescriptor {
    pub kind: IndicatorKind,
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const fn period(default: f64, min: f64) -> ParamSpec {
    ParamSpec {
        name: "period",
        default,
        min,
        max: 1000.0,
        integer: true,
    }
}

const fn saturation(default: f64, max: f64) -> ParamSpec {
    ParamSpec {
        name: "saturation",
        default,
        min: 1e-9,
        max,
        integer: false,
    }
}

pub static CATALOG: &[IndicatorDescriptor] = &[
    IndicatorDescriptor {
        kind: IndicatorKind::Sma,
        key: "sma",
        aliases: &["ma", "moving_average"],
        name: "SMA",
        description: "Simple moving average; close above the average is bullish",
        params: &[period(20.0, 1.0), saturation(0.02, 1.0)],
    },
    IndicatorDescriptor {
        kind: IndicatorKind::Ema,
        key: "ema",
        aliases: &["exponential_ma"],
        name: "EMA",
        description: "Exponential moving average; close above the average is bullish",
        params: &[period(20.0, 1.0), saturation(0.02, 1.0)],
    },
    IndicatorDescriptor {
        kind: IndicatorKind::Rsi,
        key: "rsi",
        aliases: &[],
        name: "RSI",
        description: "Relative strength index; oversold is bullish",
        params: &[period(14.0, 1.0)],
    },
    IndicatorDescriptor {
        kind: IndicatorKind::Macd,
        key: "macd",
        aliases: &[],
        name: "MACD",
        description: "MACD histogram relative to price; positive histogram is bullish",
        params: &[
            ParamSpec {
                name: "fast",
                default: 12.0,
                min: 1.0,
                max: 1000.0,
                integer: true,
            },
            ParamSpec {
                name: "slow",
                default: 26.0,
                min: 2.0,
                max: 1000.0,
                integer: true,
            },
            ParamSpec {
                name: "signal",
                default: 9.0,
                min: 1.0,
                max: 1000.0,
                integer: true,
            },
            saturation(0.005, 1.0),
        ],
    },
    IndicatorDescriptor {
        kind: IndicatorKind::Bollinger,
        key: "bollinger",
        aliases: &["bb"],
        name: "BOLLINGER",
        description: "Bollinger bands %B; close near the lower band is bullish",
        params: &[
            period(20.0, 2.0),
            ParamSpec {
                name: "multiplier",
                default: 2.0,
                min: 0.1,
                max: 10.0,
                integer: false,
            },
        ],
    },
    IndicatorDescriptor {
        kind: IndicatorKind::Stochastic,
        key: "stochastic",
        aliases: &["stoch"],
        name: "STOCHASTIC",
        description: "Stochastic oscillator %D; oversold is bullish",
        params: &[
            ParamSpec {
                name: "k_period",
                default: 14.0,
                min: 1.0,
                max: 1000.0,
                integer: true,
            },
            ParamSpec {
                name: "d_period",
                default: 3.0,
                min: 1.0,
                max: 1000.0,
                integer: true,
            },
        ],
    },
    IndicatorDescriptor {
        kind: IndicatorKind::Adx,
        key: "adx",
        aliases: &[],
        name: "ADX",
        description: "Directional movement (+DI vs -DI) weighted by ADX trend strength",
        params: &[period(14.0, 1.0)],
    },
    IndicatorDescriptor {
        kind: IndicatorKind::Roc,
        key: "roc",
        aliases: &["momentum"],
        name: "ROC",
        description: "Rate of change in percent; rising price is bullish",
        params: &[period(10.0, 1.0), saturation(5.0, 1000.0)],
    },
];

pub fn descriptor(kind: IndicatorKind) -> &'static IndicatorDescriptor {
    CATALOG
        .iter()
        .find(|d| d.kind == kind)
        .unwrap_or_else(|| unreachable!("catalog covers every IndicatorKind"))
}

/// Validate user-supplied parameters and fill catalog defaults.
///
/// Unknown names, non-finite values, out-of-range values, and fractional
/// values for integer parameters are all rejected.
pub fn resolve_params(
    kind: IndicatorKind,
    params: &BTreeMap<String, f64>,
) -> Result<BTreeMap<String, f64>, SignalError> {
    let desc = descriptor(kind);

    for name in params.keys() {
        if !desc.params.iter().any(|param| param.name == name) {
            return Err(SignalError::invalid_parameter(
                desc.name,
                name,
                "unknown parameter",
            ));
        }
    }

    let mut resolved = BTreeMap::new();
    for param in desc.params {
        let value = params.get(param.name).copied().unwrap_or(param.default);
        if !value.is_finite() {
            return Err(SignalError::invalid_parameter(
                desc.name,
                param.name,
                "must be a finite number",
            ));
        }
        if value < param.min || value > param.max {
            return Err(SignalError::invalid_parameter(
                desc.name,
                param.name,
                format!("{} outside [{}, {}]", value, param.min, param.max),
            ));
        }
        if param.integer && value.fract() != 0.0 {
            return Err(SignalError::invalid_parameter(
                desc.name,
                param.name,
                format!("{} must be a whole number", value),
            ));
        }
        resolved.insert(param.name.to_string(), value);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_one_descriptor() {
        let kinds = [
            IndicatorKind::Sma,
            IndicatorKind::Ema,
            IndicatorKind::Rsi,
            IndicatorKind::Macd,
            IndicatorKind::Bollinger,
            IndicatorKind::Stochastic,
            IndicatorKind::Adx,
            IndicatorKind::Roc,
        ];
        for kind in kinds {
            assert_eq!(CATALOG.iter().filter(|d| d.kind == kind).count(), 1);
        }
        assert_eq!(CATALOG.len(), kinds.len());
    }

    #[test]
    fn defaults_are_within_range() {
        for desc in CATALOG {
            for param in desc.params {
                assert!(param.default >= param.min && param.default <= param.max);
            }
        }
    }

    #[test]
    fn resolve_rejects_zero_period() {
        let mut params = BTreeMap::new();
        params.insert("period".to_string(), 0.0);
        let err = resolve_params(IndicatorKind::Rsi, &params).unwrap_err();
        assert!(matches!(err, SignalError::InvalidParameter { .. }));
    }

    #[test]
    fn resolve_rejects_fractional_period() {
        let mut params = BTreeMap::new();
        params.insert("period".to_string(), 14.5);
        assert!(resolve_params(IndicatorKind::Rsi, &params).is_err());
    }

    #[test]
    fn resolve_rejects_unknown_name() {
        let mut params = BTreeMap::new();
        params.insert("length".to_string(), 14.0);
        let err = resolve_params(IndicatorKind::Rsi, &params).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameter length for RSI: unknown parameter"
        );
    }

    #[test]
    fn resolve_keeps_supplied_values() {
        let mut params = BTreeMap::new();
        params.insert("multiplier".to_string(), 2.5);
        let resolved = resolve_params(IndicatorKind::Bollinger, &params).unwrap();
        assert_eq!(resolved["multiplier"], 2.5);
        assert_eq!(resolved["period"], 20.0);
    }
}
