//! Bar-by-bar trade simulation.
//!
//! A signal on bar i is acted on at the open of bar i+1, never within the
//! bar that produced it. Within a bar the order is:
//! 1. a pending exit (opposing signal) fills at the open
//! 2. a pending entry fills at the open
//! 3. the open position is checked against the bar's range, stop first
//! 4. on the last bar, pending orders are dropped and the position is
//!    force-closed at the close
//! 5. the bar's own signal queues an order for the next bar

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cancel::CancelToken;
use super::error::SignalError;
use super::ohlcv::PriceBar;
use super::position::{ExitReason, Position, SimulatedTrade, Side};
use super::signal::{Direction, Signal};
use super::sizing::{FixedFractional, PositionSizer};

/// Risk and cost parameters for the simulator. Percentages are in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Stop distance from entry; 0 disables both stop and target.
    pub stop_loss_pct: f64,
    /// Target distance as a multiple of the stop distance; 0 disables the target.
    pub risk_reward_ratio: f64,
    /// Share of equity risked per trade.
    pub risk_pct: f64,
    /// Entries need at least this signal confidence.
    pub min_confidence: f64,
    pub allow_shorting: bool,
    pub slippage_pct: f64,
    pub commission_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            stop_loss_pct: 2.0,
            risk_reward_ratio: 2.0,
            risk_pct: 1.0,
            min_confidence: 0.0,
            allow_shorting: true,
            slippage_pct: 0.0,
            commission_pct: 0.0,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        let non_negative = [
            ("stop_loss_pct", self.stop_loss_pct),
            ("risk_reward_ratio", self.risk_reward_ratio),
            ("slippage_pct", self.slippage_pct),
            ("commission_pct", self.commission_pct),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SignalError::config_invalid(
                    "risk",
                    key,
                    format!("{} must be non-negative", key),
                ));
            }
        }
        if self.stop_loss_pct >= 100.0 {
            return Err(SignalError::config_invalid(
                "risk",
                "stop_loss_pct",
                "stop_loss_pct must be below 100",
            ));
        }
        if !self.risk_pct.is_finite() || self.risk_pct <= 0.0 || self.risk_pct > 100.0 {
            return Err(SignalError::config_invalid(
                "risk",
                "risk_pct",
                "risk_pct must be in (0, 100]",
            ));
        }
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(SignalError::config_invalid(
                "risk",
                "min_confidence",
                "min_confidence must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

/// Commission for one unit round trip, in price units.
pub fn calculate_commission(entry_price: f64, exit_price: f64, commission_pct: f64) -> f64 {
    (entry_price + exit_price) * commission_pct / 100.0
}

/// Long entry (buy): execution_price = market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_long_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Short entry (sell short): execution_price = market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_short_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Long exit (sell): execution_price = market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_long_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Short exit (buy to cover): execution_price = market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_short_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered(Position),
    InsufficientCapital,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub trades: Vec<SimulatedTrade>,
    pub final_equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingOrder {
    Enter(Side),
    Exit,
}

#[derive(Debug)]
pub struct TradeSimulator {
    risk: RiskConfig,
    initial_capital: f64,
    sizer: Box<dyn PositionSizer>,
}

impl TradeSimulator {
    pub fn new(risk: RiskConfig, initial_capital: f64) -> Self {
        let sizer = Box::new(FixedFractional {
            risk_pct: risk.risk_pct,
        });
        TradeSimulator {
            risk,
            initial_capital,
            sizer,
        }
    }

    pub fn with_sizer(mut self, sizer: Box<dyn PositionSizer>) -> Self {
        self.sizer = sizer;
        self
    }

    pub fn risk(&self) -> &RiskConfig {
        &self.risk
    }

    /// Open a position at `market_price` with protective levels from the
    /// execution price.
    pub fn enter(
        &self,
        side: Side,
        bar: &PriceBar,
        index: usize,
        market_price: f64,
        equity: f64,
    ) -> EntryResult {
        let entry_price = match side {
            Side::Long => apply_slippage_long_entry(market_price, self.risk.slippage_pct),
            Side::Short => apply_slippage_short_entry(market_price, self.risk.slippage_pct),
        };

        let stop_distance =
            (self.risk.stop_loss_pct > 0.0).then(|| entry_price * self.risk.stop_loss_pct / 100.0);
        let quantity = self.sizer.quantity(equity, entry_price, stop_distance);
        if !quantity.is_finite() || quantity <= 0.0 {
            return EntryResult::InsufficientCapital;
        }

        let stop_loss = stop_distance.map(|d| entry_price - side.sign() * d);
        let take_profit = stop_distance
            .filter(|_| self.risk.risk_reward_ratio > 0.0)
            .map(|d| entry_price + side.sign() * d * self.risk.risk_reward_ratio);

        EntryResult::Entered(Position {
            side,
            quantity,
            entry_price,
            entry_time: bar.timestamp,
            entry_index: index,
            stop_loss,
            take_profit,
        })
    }

    /// Close `position` at `market_price` on `bar`.
    pub fn exit(
        &self,
        position: Position,
        bar: &PriceBar,
        index: usize,
        market_price: f64,
        reason: ExitReason,
    ) -> SimulatedTrade {
        let exit_price = match position.side {
            Side::Long => apply_slippage_long_exit(market_price, self.risk.slippage_pct),
            Side::Short => apply_slippage_short_exit(market_price, self.risk.slippage_pct),
        };

        let commission =
            calculate_commission(position.entry_price, exit_price, self.risk.commission_pct);
        let pnl = position.side.sign() * (exit_price - position.entry_price) - commission;
        let pnl_pct = if position.entry_price != 0.0 {
            pnl / position.entry_price * 100.0
        } else {
            0.0
        };

        SimulatedTrade {
            direction: position.side,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_time: bar.timestamp,
            exit_price,
            exit_reason: reason,
            quantity: position.quantity,
            pnl,
            pnl_pct,
            profit: pnl * position.quantity,
            commission,
            bars_held: index - position.entry_index,
        }
    }

    /// Replay `signals` over `bars`.
    ///
    /// Signals are matched to bars by timestamp; signals on timestamps not
    /// present in `bars` are ignored.
    pub fn simulate(
        &self,
        bars: &[PriceBar],
        signals: &[Signal],
        cancel: &CancelToken,
    ) -> Result<SimulationOutcome, SignalError> {
        let mut trades = Vec::new();
        let mut equity = self.initial_capital;
        let mut position: Option<Position> = None;
        let mut pending: Option<PendingOrder> = None;
        let mut next_signal = 0;
        let last = bars.len().saturating_sub(1);

        for (i, bar) in bars.iter().enumerate() {
            cancel.check()?;

            match pending.take() {
                Some(PendingOrder::Exit) => {
                    if let Some(open) = position.take() {
                        let trade =
                            self.exit(open, bar, i, bar.open, ExitReason::OpposingSignal);
                        equity += trade.profit;
                        trades.push(trade);
                    }
                }
                Some(PendingOrder::Enter(side)) if position.is_none() => {
                    match self.enter(side, bar, i, bar.open, equity) {
                        EntryResult::Entered(opened) => {
                            debug!(side = %side, price = opened.entry_price, time = %bar.timestamp, "entered");
                            position = Some(opened);
                        }
                        EntryResult::InsufficientCapital => {
                            warn!(equity, time = %bar.timestamp, "entry skipped: insufficient capital");
                        }
                    }
                }
                _ => {}
            }

            if let Some((reason, fill)) = position.as_ref().and_then(|p| p.check_exit(bar)) {
                if let Some(open) = position.take() {
                    let trade = self.exit(open, bar, i, fill, reason);
                    equity += trade.profit;
                    trades.push(trade);
                }
            }

            if i == last {
                if let Some(open) = position.take() {
                    let trade = self.exit(open, bar, i, bar.close, ExitReason::EndOfWindow);
                    equity += trade.profit;
                    trades.push(trade);
                }
                break;
            }

            while next_signal < signals.len() && signals[next_signal].timestamp < bar.timestamp {
                next_signal += 1;
            }
            if let Some(signal) = signals
                .get(next_signal)
                .filter(|s| s.timestamp == bar.timestamp)
            {
                pending = self.react(position.as_ref(), signal);
                next_signal += 1;
            }
        }

        Ok(SimulationOutcome {
            trades,
            final_equity: equity,
        })
    }

    fn react(&self, position: Option<&Position>, signal: &Signal) -> Option<PendingOrder> {
        let wanted = match signal.direction {
            Direction::Buy => Side::Long,
            Direction::Sell => Side::Short,
            Direction::Neutral => return None,
        };
        match position {
            Some(open) if open.side == wanted => None,
            Some(_) => Some(PendingOrder::Exit),
            None => {
                if signal.confidence < self.risk.min_confidence {
                    return None;
                }
                if wanted == Side::Short && !self.risk.allow_shorting {
                    return None;
                }
                Some(PendingOrder::Enter(wanted))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Thresholds;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::hours(i as i64)
    }

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            timestamp: ts(i),
            open,
            high,
            low,
            close,
            volume: 0.0,
        }
    }

    fn flat_bar(i: usize, price: f64) -> PriceBar {
        bar(i, price, price, price, price)
    }

    fn signal_at(bars: &[PriceBar], i: usize, score: f64) -> Signal {
        Signal::from_score(&bars[i], score, &Thresholds::new(0.5, 0.5))
    }

    fn no_stops() -> RiskConfig {
        RiskConfig {
            stop_loss_pct: 0.0,
            risk_reward_ratio: 0.0,
            risk_pct: 100.0,
            ..RiskConfig::default()
        }
    }

    #[test]
    fn slippage_long_entry() {
        let price = apply_slippage_long_entry(100.0, 0.05);
        assert!((price - 100.0 * 1.0005).abs() < f64::EPSILON);
    }

    #[test]
    fn slippage_short_entry() {
        let price = apply_slippage_short_entry(100.0, 0.05);
        assert!((price - 100.0 * 0.9995).abs() < f64::EPSILON);
    }

    #[test]
    fn slippage_long_exit() {
        let price = apply_slippage_long_exit(100.0, 0.05);
        assert!((price - 100.0 * 0.9995).abs() < f64::EPSILON);
    }

    #[test]
    fn slippage_short_exit() {
        let price = apply_slippage_short_exit(100.0, 0.05);
        assert!((price - 100.0 * 1.0005).abs() < f64::EPSILON);
    }

    #[test]
    fn commission_on_both_legs() {
        let c = calculate_commission(100.0, 110.0, 0.1);
        assert!((c - 0.21).abs() < 1e-12);
    }

    #[test]
    fn entry_at_next_bar_open() {
        let bars = vec![
            flat_bar(0, 100.0),
            bar(1, 101.0, 102.0, 100.5, 101.5),
            flat_bar(2, 103.0),
        ];
        let signals = vec![signal_at(&bars, 0, 0.9)];
        let sim = TradeSimulator::new(no_stops(), 10_000.0);
        let outcome = sim.simulate(&bars, &signals, &CancelToken::new()).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert_eq!(trade.entry_time, ts(1));
        assert!((trade.entry_price - 101.0).abs() < 1e-12);
        assert_eq!(trade.exit_reason, ExitReason::EndOfWindow);
        assert!((trade.exit_price - 103.0).abs() < 1e-12);
        assert_eq!(trade.bars_held, 1);
    }

    #[test]
    fn signal_on_last_bar_never_trades() {
        let bars = vec![flat_bar(0, 100.0), flat_bar(1, 101.0)];
        let signals = vec![signal_at(&bars, 1, 0.9)];
        let sim = TradeSimulator::new(no_stops(), 10_000.0);
        let outcome = sim.simulate(&bars, &signals, &CancelToken::new()).unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.final_equity, 10_000.0);
    }

    #[test]
    fn opposing_signal_closes_without_reversing() {
        let bars: Vec<PriceBar> = (0..6).map(|i| flat_bar(i, 100.0 + i as f64)).collect();
        let signals = vec![signal_at(&bars, 0, 0.9), signal_at(&bars, 2, -0.9)];
        let sim = TradeSimulator::new(no_stops(), 10_000.0);
        let outcome = sim.simulate(&bars, &signals, &CancelToken::new()).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert_eq!(trade.direction, Side::Long);
        assert_eq!(trade.exit_reason, ExitReason::OpposingSignal);
        assert_eq!(trade.exit_time, ts(3));
        assert!((trade.pnl - 2.0).abs() < 1e-12);
    }

    #[test]
    fn same_direction_signal_is_noop() {
        let bars: Vec<PriceBar> = (0..5).map(|i| flat_bar(i, 100.0)).collect();
        let signals = vec![
            signal_at(&bars, 0, 0.9),
            signal_at(&bars, 1, 0.9),
            signal_at(&bars, 2, 0.9),
        ];
        let sim = TradeSimulator::new(no_stops(), 10_000.0);
        let outcome = sim.simulate(&bars, &signals, &CancelToken::new()).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].entry_time, ts(1));
    }

    #[test]
    fn confidence_gate_blocks_entry() {
        let bars: Vec<PriceBar> = (0..4).map(|i| flat_bar(i, 100.0)).collect();
        let signals = vec![signal_at(&bars, 0, 0.6)];
        let risk = RiskConfig {
            min_confidence: 0.7,
            ..no_stops()
        };
        let outcome = TradeSimulator::new(risk, 10_000.0)
            .simulate(&bars, &signals, &CancelToken::new())
            .unwrap();
        assert!(outcome.trades.is_empty());
    }

    #[test]
    fn shorting_disabled_ignores_sell_entries() {
        let bars: Vec<PriceBar> = (0..4).map(|i| flat_bar(i, 100.0)).collect();
        let signals = vec![signal_at(&bars, 0, -0.9)];
        let risk = RiskConfig {
            allow_shorting: false,
            ..no_stops()
        };
        let outcome = TradeSimulator::new(risk, 10_000.0)
            .simulate(&bars, &signals, &CancelToken::new())
            .unwrap();
        assert!(outcome.trades.is_empty());
    }

    #[test]
    fn stop_checked_before_take_profit() {
        // entry 1.1000, stop 0.4545..% away -> 1.0950, target 2x -> 1.1100
        let bars = vec![
            flat_bar(0, 1.1000),
            flat_bar(1, 1.1000),
            bar(2, 1.1000, 1.1120, 1.0940, 1.1000),
            flat_bar(3, 1.1000),
        ];
        let risk = RiskConfig {
            stop_loss_pct: 0.005 / 1.1 * 100.0,
            risk_reward_ratio: 2.0,
            risk_pct: 1.0,
            ..RiskConfig::default()
        };
        let signals = vec![signal_at(&bars, 0, 0.9)];
        let outcome = TradeSimulator::new(risk, 10_000.0)
            .simulate(&bars, &signals, &CancelToken::new())
            .unwrap();

        let trade = &outcome.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!((trade.exit_price - 1.0950).abs() < 1e-9);
        assert!(trade.pnl < 0.0);
        // 1% risk would need 20_000 units; capped at what equity buys
        let quantity = 10_000.0 / 1.1;
        assert!((trade.quantity - quantity).abs() < 1e-6);
        assert!((outcome.final_equity - (10_000.0 - quantity * 0.005)).abs() < 1e-6);
    }

    #[test]
    fn short_take_profit() {
        let bars = vec![
            flat_bar(0, 100.0),
            flat_bar(1, 100.0),
            bar(2, 99.0, 99.5, 95.0, 96.0),
            flat_bar(3, 96.0),
        ];
        let risk = RiskConfig {
            stop_loss_pct: 2.0,
            risk_reward_ratio: 2.0,
            ..RiskConfig::default()
        };
        let signals = vec![signal_at(&bars, 0, -0.9)];
        let outcome = TradeSimulator::new(risk, 10_000.0)
            .simulate(&bars, &signals, &CancelToken::new())
            .unwrap();
        let trade = &outcome.trades[0];
        assert_eq!(trade.direction, Side::Short);
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert!((trade.exit_price - 96.0).abs() < 1e-9);
        assert!((trade.pnl - 4.0).abs() < 1e-9);
    }

    #[test]
    fn commission_and_slippage_reduce_pnl() {
        let bars: Vec<PriceBar> = (0..3).map(|i| flat_bar(i, 100.0)).collect();
        let signals = vec![signal_at(&bars, 0, 0.9)];
        let risk = RiskConfig {
            slippage_pct: 0.1,
            commission_pct: 0.1,
            ..no_stops()
        };
        let outcome = TradeSimulator::new(risk, 10_000.0)
            .simulate(&bars, &signals, &CancelToken::new())
            .unwrap();
        let trade = &outcome.trades[0];
        assert!((trade.entry_price - 100.1).abs() < 1e-9);
        assert!((trade.exit_price - 99.9).abs() < 1e-9);
        assert!((trade.commission - 0.2).abs() < 1e-9);
        assert!((trade.pnl + 0.4).abs() < 1e-9);
    }

    #[test]
    fn equity_compounds() {
        let bars: Vec<PriceBar> = (0..4).map(|i| flat_bar(i, 100.0 + 10.0 * i as f64)).collect();
        let signals = vec![signal_at(&bars, 0, 0.9)];
        let outcome = TradeSimulator::new(no_stops(), 1_000.0)
            .simulate(&bars, &signals, &CancelToken::new())
            .unwrap();
        // 10 units at 110, closed at 130
        assert!((outcome.trades[0].quantity - 1_000.0 / 110.0).abs() < 1e-9);
        assert!((outcome.final_equity - (1_000.0 + 20.0 * 1_000.0 / 110.0)).abs() < 1e-9);
    }

    #[test]
    fn cancelled_simulation() {
        let bars: Vec<PriceBar> = (0..3).map(|i| flat_bar(i, 100.0)).collect();
        let token = CancelToken::new();
        token.cancel();
        let result = TradeSimulator::new(no_stops(), 1_000.0).simulate(&bars, &[], &token);
        assert!(matches!(result, Err(SignalError::Cancelled)));
    }

    #[test]
    fn risk_validation() {
        assert!(RiskConfig::default().validate().is_ok());
        let bad = RiskConfig {
            risk_pct: 0.0,
            ..RiskConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = RiskConfig {
            min_confidence: 1.5,
            ..RiskConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
