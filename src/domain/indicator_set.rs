//! Weighted indicator configurations and composite score evaluation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::cancel::CancelToken;
use super::error::SignalError;
use super::indicator::normalize::contribution;
use super::indicator::{IndicatorKind, IndicatorType};
use super::ohlcv::PriceBar;

/// Whether an indicator's bullish reading counts toward BUY or SELL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Bullish,
    Bearish,
}

impl Polarity {
    pub fn sign(&self) -> f64 {
        match self {
            Polarity::Bullish => 1.0,
            Polarity::Bearish => -1.0,
        }
    }
}

impl FromStr for Polarity {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "+1" | "1" | "bullish" => Ok(Polarity::Bullish),
            "-1" | "bearish" => Ok(Polarity::Bearish),
            _ => Err(SignalError::InconsistentConfiguration {
                reason: format!("unknown polarity '{}' (expected +1 or -1)", s),
            }),
        }
    }
}

/// How the weighted sum of contributions becomes a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Divide by the sum of weights.
    #[default]
    SumOfWeights,
    /// Clamp the raw weighted sum to [-1, 1].
    Clamped,
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationMode::SumOfWeights => f.write_str("sum_of_weights"),
            NormalizationMode::Clamped => f.write_str("clamped"),
        }
    }
}

impl FromStr for NormalizationMode {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum_of_weights" | "weights" => Ok(NormalizationMode::SumOfWeights),
            "clamped" | "clamp" => Ok(NormalizationMode::Clamped),
            _ => Err(SignalError::config_invalid(
                "signal",
                "normalization",
                format!("unknown normalization mode '{}'", s),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub kind: IndicatorKind,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    pub weight: f64,
    #[serde(default)]
    pub polarity: Polarity,
}

impl IndicatorConfig {
    pub fn new(kind: IndicatorKind, weight: f64) -> Self {
        IndicatorConfig {
            kind,
            params: BTreeMap::new(),
            weight,
            polarity: Polarity::Bullish,
        }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn resolve(&self) -> Result<IndicatorType, SignalError> {
        IndicatorType::from_params(self.kind, &self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub configs: Vec<IndicatorConfig>,
    #[serde(default)]
    pub normalization: NormalizationMode,
}

/// Composite score for one bar; `None` while any indicator is warming up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
}

impl IndicatorSet {
    pub fn new(configs: Vec<IndicatorConfig>) -> Self {
        IndicatorSet {
            configs,
            normalization: NormalizationMode::default(),
        }
    }

    pub fn with_normalization(mut self, normalization: NormalizationMode) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn total_weight(&self) -> f64 {
        self.configs.iter().map(|c| c.weight).sum()
    }

    /// Check weights and resolve every indicator's parameters.
    pub fn validate(&self) -> Result<Vec<IndicatorType>, SignalError> {
        if self.configs.is_empty() {
            return Err(SignalError::InconsistentConfiguration {
                reason: "indicator set is empty".into(),
            });
        }
        for (i, config) in self.configs.iter().enumerate() {
            if !config.weight.is_finite() || config.weight < 0.0 {
                return Err(SignalError::InconsistentConfiguration {
                    reason: format!(
                        "indicator {} ({}) has weight {}; weights must be finite and non-negative",
                        i, config.kind, config.weight
                    ),
                });
            }
        }
        let total = self.total_weight();
        if total <= 0.0 {
            return Err(SignalError::InconsistentConfiguration {
                reason: "sum of indicator weights must be positive".into(),
            });
        }
        self.configs.iter().map(IndicatorConfig::resolve).collect()
    }

    /// Bars needed before the slowest indicator yields its first value.
    pub fn warmup(&self) -> Result<usize, SignalError> {
        Ok(self
            .validate()?
            .iter()
            .map(IndicatorType::warmup)
            .max()
            .unwrap_or(0))
    }

    /// Per-bar composite score aligned with `bars`.
    ///
    /// A bar has a score only when every indicator in the set is available
    /// on it. Score at bar i depends only on bars up to and including i.
    pub fn evaluate(
        &self,
        bars: &[PriceBar],
        cancel: &CancelToken,
    ) -> Result<Vec<CompositeScore>, SignalError> {
        let indicators = self.validate()?;
        let total_weight = self.total_weight();

        let mut series = Vec::with_capacity(indicators.len());
        for indicator in &indicators {
            cancel.check()?;
            series.push(indicator.compute(bars)?);
        }
        debug!(
            indicators = indicators.len(),
            bars = bars.len(),
            "computed indicator series"
        );

        let mut scores = Vec::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            cancel.check()?;
            let mut weighted = 0.0;
            let mut available = true;
            for ((indicator, config), s) in indicators.iter().zip(&self.configs).zip(&series) {
                match &s.values[i].value {
                    Some(value) => {
                        weighted +=
                            contribution(indicator, bar, value) * config.weight * config.polarity.sign();
                    }
                    None => {
                        available = false;
                        break;
                    }
                }
            }

            let value = available.then(|| match self.normalization {
                NormalizationMode::SumOfWeights => (weighted / total_weight).clamp(-1.0, 1.0),
                NormalizationMode::Clamped => weighted.clamp(-1.0, 1.0),
            });
            scores.push(CompositeScore {
                timestamp: bar.timestamp,
                value,
            });
        }
        Ok(scores)
    }
}
