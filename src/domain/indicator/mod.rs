//! Technical indicator library.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: one point in an indicator series; `None` during warm-up
//! - `IndicatorValue`: enum for the different indicator output shapes
//! - `IndicatorKind`: the fixed catalog of indicator families
//! - `IndicatorType`: indicator identity plus resolved parameters
//! - `IndicatorSeries`: a series aligned 1:1 with its price bars
//!
//! Every `calculate_*` function is deterministic, side-effect free, and
//! rejects out-of-domain parameters with `SignalError::InvalidParameter`.

pub mod adx;
pub mod bollinger;
pub mod catalog;
pub mod ema;
pub mod macd;
pub mod normalize;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use adx::calculate_adx;
pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use roc::calculate_roc;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stochastic::calculate_stochastic;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SignalError;
use crate::domain::ohlcv::PriceBar;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub value: Option<IndicatorValue>,
}

impl IndicatorPoint {
    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }

    /// The scalar reading for single-valued indicators.
    pub fn simple(&self) -> Option<f64> {
        match self.value {
            Some(IndicatorValue::Simple(v)) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Adx {
        adx: f64,
        plus_di: f64,
        minus_di: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Stochastic,
    Adx,
    Roc,
}

impl IndicatorKind {
    pub fn name(&self) -> &'static str {
        catalog::descriptor(*self).name
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndicatorKind {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        catalog::CATALOG
            .iter()
            .find(|d| d.key == key || d.aliases.contains(&key.as_str()))
            .map(|d| d.kind)
            .ok_or_else(|| SignalError::InconsistentConfiguration {
                reason: format!("unknown indicator type '{}'", s),
            })
    }
}

/// Indicator identity with every parameter resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Sma {
        period: usize,
        saturation: f64,
    },
    Ema {
        period: usize,
        saturation: f64,
    },
    Rsi {
        period: usize,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
        saturation: f64,
    },
    Bollinger {
        period: usize,
        multiplier: f64,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Adx {
        period: usize,
    },
    Roc {
        period: usize,
        saturation: f64,
    },
}

impl IndicatorType {
    /// Resolve named parameters against the catalog, filling defaults.
    pub fn from_params(
        kind: IndicatorKind,
        params: &BTreeMap<String, f64>,
    ) -> Result<Self, SignalError> {
        let p = catalog::resolve_params(kind, params)?;
        let int = |name: &str| p[name] as usize;

        let indicator = match kind {
            IndicatorKind::Sma => IndicatorType::Sma {
                period: int("period"),
                saturation: p["saturation"],
            },
            IndicatorKind::Ema => IndicatorType::Ema {
                period: int("period"),
                saturation: p["saturation"],
            },
            IndicatorKind::Rsi => IndicatorType::Rsi {
                period: int("period"),
            },
            IndicatorKind::Macd => {
                let (fast, slow) = (int("fast"), int("slow"));
                if fast >= slow {
                    return Err(SignalError::invalid_parameter(
                        kind.name(),
                        "fast",
                        format!("fast period {} must be shorter than slow period {}", fast, slow),
                    ));
                }
                IndicatorType::Macd {
                    fast,
                    slow,
                    signal: int("signal"),
                    saturation: p["saturation"],
                }
            }
            IndicatorKind::Bollinger => IndicatorType::Bollinger {
                period: int("period"),
                multiplier: p["multiplier"],
            },
            IndicatorKind::Stochastic => IndicatorType::Stochastic {
                k_period: int("k_period"),
                d_period: int("d_period"),
            },
            IndicatorKind::Adx => IndicatorType::Adx {
                period: int("period"),
            },
            IndicatorKind::Roc => IndicatorType::Roc {
                period: int("period"),
                saturation: p["saturation"],
            },
        };
        Ok(indicator)
    }

    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorType::Sma { .. } => IndicatorKind::Sma,
            IndicatorType::Ema { .. } => IndicatorKind::Ema,
            IndicatorType::Rsi { .. } => IndicatorKind::Rsi,
            IndicatorType::Macd { .. } => IndicatorKind::Macd,
            IndicatorType::Bollinger { .. } => IndicatorKind::Bollinger,
            IndicatorType::Stochastic { .. } => IndicatorKind::Stochastic,
            IndicatorType::Adx { .. } => IndicatorKind::Adx,
            IndicatorType::Roc { .. } => IndicatorKind::Roc,
        }
    }

    /// Number of leading bars with no value.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma { period, .. }
            | IndicatorType::Ema { period, .. }
            | IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorType::Rsi { period } | IndicatorType::Roc { period, .. } => period,
            IndicatorType::Macd { slow, signal, .. } => {
                slow.saturating_sub(1) + signal.saturating_sub(1)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                k_period.saturating_sub(1) + d_period.saturating_sub(1)
            }
            IndicatorType::Adx { period } => (2 * period).saturating_sub(1),
        }
    }

    pub fn compute(&self, bars: &[PriceBar]) -> Result<IndicatorSeries, SignalError> {
        match *self {
            IndicatorType::Sma { period, .. } => calculate_sma(bars, period),
            IndicatorType::Ema { period, .. } => calculate_ema(bars, period),
            IndicatorType::Rsi { period } => calculate_rsi(bars, period),
            IndicatorType::Macd {
                fast, slow, signal, ..
            } => calculate_macd(bars, fast, slow, signal),
            IndicatorType::Bollinger { period, multiplier } => {
                calculate_bollinger(bars, period, multiplier)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                calculate_stochastic(bars, k_period, d_period)
            }
            IndicatorType::Adx { period } => calculate_adx(bars, period),
            IndicatorType::Roc { period, .. } => calculate_roc(bars, period),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma { period, .. } => write!(f, "SMA({})", period),
            IndicatorType::Ema { period, .. } => write!(f, "EMA({})", period),
            IndicatorType::Rsi { period } => write!(f, "RSI({})", period),
            IndicatorType::Macd {
                fast, slow, signal, ..
            } => write!(f, "MACD({},{},{})", fast, slow, signal),
            IndicatorType::Bollinger { period, multiplier } => {
                write!(f, "BOLLINGER({},{})", period, multiplier)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Adx { period } => write!(f, "ADX({})", period),
            IndicatorType::Roc { period, .. } => write!(f, "ROC({})", period),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Index of the first available point, if any.
    pub fn first_available(&self) -> Option<usize> {
        self.values.iter().position(|p| p.is_available())
    }
}
