//! Open position state and closed trade records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ohlcv::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    OpposingSignal,
    EndOfWindow,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => f.write_str("STOP_LOSS"),
            ExitReason::TakeProfit => f.write_str("TAKE_PROFIT"),
            ExitReason::OpposingSignal => f.write_str("OPPOSING_SIGNAL"),
            ExitReason::EndOfWindow => f.write_str("END_OF_WINDOW"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub entry_index: usize,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.sign() * self.quantity * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        match self.stop_loss {
            None => false,
            Some(stop) if self.is_long() => price <= stop,
            Some(stop) => price >= stop,
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        match self.take_profit {
            None => false,
            Some(target) if self.is_long() => price >= target,
            Some(target) => price <= target,
        }
    }

    /// Check a bar's range against the protective levels.
    ///
    /// The stop is checked first, so a bar touching both levels exits at
    /// the stop. A stop gapped through at the open fills at the open;
    /// a take-profit fills at its level. Returns the reason and the market
    /// fill price before slippage.
    pub fn check_exit(&self, bar: &PriceBar) -> Option<(ExitReason, f64)> {
        let (adverse, favourable) = if self.is_long() {
            (bar.low, bar.high)
        } else {
            (bar.high, bar.low)
        };

        if self.should_stop_loss(adverse) {
            let stop = self.stop_loss?;
            let fill = if self.is_long() {
                bar.open.min(stop)
            } else {
                bar.open.max(stop)
            };
            return Some((ExitReason::StopLoss, fill));
        }
        if self.should_take_profit(favourable) {
            return Some((ExitReason::TakeProfit, self.take_profit?));
        }
        None
    }
}

/// One completed round trip.
///
/// `pnl` is per unit in price terms after commission; `profit` is `pnl`
/// times `quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub direction: Side,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub quantity: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub profit: f64,
    pub commission: f64,
    pub bars_held: usize,
}

impl SimulatedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}
