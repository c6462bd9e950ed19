//! Signal generation from composite scores.
//!
//! Discretisation is inclusive at the thresholds: a score exactly equal to
//! `+buy` is BUY and exactly `-sell` is SELL.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::cancel::CancelToken;
use super::error::SignalError;
use super::indicator_set::{CompositeScore, IndicatorSet};
use super::ohlcv::{validate_series, PriceBar};

pub const DEFAULT_BUY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_SELL_THRESHOLD: f64 = 0.5;

/// Offset of the suggested entry from the signal bar's close.
const ENTRY_OFFSET: f64 = 0.001;
/// Stop distance is `STOP_BASE - STOP_CONFIDENCE_SCALE * confidence`.
const STOP_BASE: f64 = 0.05;
const STOP_CONFIDENCE_SCALE: f64 = 0.03;
/// Target distance is `TARGET_BASE + TARGET_CONFIDENCE_SCALE * confidence`.
const TARGET_BASE: f64 = 0.05;
const TARGET_CONFIDENCE_SCALE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
            Direction::Neutral => f.write_str("NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub buy: f64,
    pub sell: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            buy: DEFAULT_BUY_THRESHOLD,
            sell: DEFAULT_SELL_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(buy: f64, sell: f64) -> Self {
        Thresholds { buy, sell }
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        for (key, value) in [("buy_threshold", self.buy), ("sell_threshold", self.sell)] {
            if !value.is_finite() || value < 0.0 || value > 1.0 {
                return Err(SignalError::config_invalid(
                    "signal",
                    key,
                    format!("{} must be between 0 and 1", value),
                ));
            }
        }
        Ok(())
    }

    pub fn discretize(&self, score: f64) -> Direction {
        if score >= self.buy {
            Direction::Buy
        } else if score <= -self.sell {
            Direction::Sell
        } else {
            Direction::Neutral
        }
    }
}

/// Suggested execution levels attached to a directional signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub potential_gain_pct: f64,
    pub risk_reward: f64,
}

impl TradeLevels {
    pub fn for_signal(direction: Direction, price: f64, confidence: f64) -> Option<Self> {
        let stop_distance = STOP_BASE - STOP_CONFIDENCE_SCALE * confidence;
        let target_distance = TARGET_BASE + TARGET_CONFIDENCE_SCALE * confidence;
        let (entry, stop_loss, take_profit) = match direction {
            Direction::Buy => {
                let entry = price * (1.0 + ENTRY_OFFSET);
                (
                    entry,
                    entry * (1.0 - stop_distance),
                    entry * (1.0 + target_distance),
                )
            }
            Direction::Sell => {
                let entry = price * (1.0 - ENTRY_OFFSET);
                (
                    entry,
                    entry * (1.0 + stop_distance),
                    entry * (1.0 - target_distance),
                )
            }
            Direction::Neutral => return None,
        };

        let risk = (entry - stop_loss).abs();
        let reward = (take_profit - entry).abs();
        let potential_gain_pct = if entry != 0.0 {
            reward / entry * 100.0
        } else {
            0.0
        };
        let risk_reward = if risk > 0.0 { reward / risk } else { 0.0 };

        Some(TradeLevels {
            entry,
            stop_loss,
            take_profit,
            potential_gain_pct,
            risk_reward,
        })
    }
}

/// One self-contained signal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    pub confidence: f64,
    pub score: f64,
    pub price: f64,
    pub levels: Option<TradeLevels>,
}

impl Signal {
    pub fn from_score(bar: &PriceBar, score: f64, thresholds: &Thresholds) -> Self {
        let direction = thresholds.discretize(score);
        let confidence = score.abs().clamp(0.0, 1.0);
        Signal {
            timestamp: bar.timestamp,
            direction,
            confidence,
            score,
            price: bar.close,
            levels: TradeLevels::for_signal(direction, bar.close, confidence),
        }
    }

    pub fn is_directional(&self) -> bool {
        self.direction != Direction::Neutral
    }
}

/// Map scores to signals; bars without a score produce no signal.
fn signals_from_scores(
    bars: &[PriceBar],
    scores: &[CompositeScore],
    thresholds: &Thresholds,
) -> Vec<Signal> {
    bars.iter()
        .zip(scores)
        .filter_map(|(bar, score)| {
            score
                .value
                .map(|value| Signal::from_score(bar, value, thresholds))
        })
        .collect()
}

/// One Signal per bar with an available composite score, in bar order.
pub fn generate(
    bars: &[PriceBar],
    set: &IndicatorSet,
    thresholds: &Thresholds,
    cancel: &CancelToken,
) -> Result<Vec<Signal>, SignalError> {
    signals_for_window(bars, 0, set, thresholds, cancel)
}

/// Signals for `bars[window_start..]`; earlier bars only warm the
/// indicators up.
///
/// Fails with `EmptyPriceSeries` when the window holds no bars, `Data` when
/// the series is malformed, and `InsufficientHistory` when no window bar
/// has a composite score.
pub fn signals_for_window(
    bars: &[PriceBar],
    window_start: usize,
    set: &IndicatorSet,
    thresholds: &Thresholds,
    cancel: &CancelToken,
) -> Result<Vec<Signal>, SignalError> {
    thresholds.validate()?;
    if window_start >= bars.len() {
        return Err(SignalError::EmptyPriceSeries {
            pair: String::new(),
            timeframe: String::new(),
        });
    }
    validate_series(bars)?;

    let warmup = set.warmup()?;
    let scores = set.evaluate(bars, cancel)?;
    let window_scores = &scores[window_start..];
    if window_scores.iter().all(|s| s.value.is_none()) {
        return Err(SignalError::InsufficientHistory {
            bars: bars.len(),
            required: warmup + 1,
        });
    }
    Ok(signals_from_scores(
        &bars[window_start..],
        window_scores,
        thresholds,
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub total: usize,
    pub buy: usize,
    pub sell: usize,
    pub neutral: usize,
    pub average_confidence: f64,
    pub average_risk_reward: Option<f64>,
    pub last_price: Option<f64>,
}

impl SignalSummary {
    pub fn from_signals(signals: &[Signal]) -> Self {
        let count = |d: Direction| signals.iter().filter(|s| s.direction == d).count();

        let average_confidence = if signals.is_empty() {
            0.0
        } else {
            signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64
        };

        let ratios: Vec<f64> = signals
            .iter()
            .filter_map(|s| s.levels.map(|l| l.risk_reward))
            .collect();
        let average_risk_reward = if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
        };

        SignalSummary {
            total: signals.len(),
            buy: count(Direction::Buy),
            sell: count(Direction::Sell),
            neutral: count(Direction::Neutral),
            average_confidence,
            average_risk_reward,
            last_price: signals.last().map(|s| s.price),
        }
    }
}
