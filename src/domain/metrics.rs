//! Performance metrics over a closed trade sequence.
//!
//! Return-like figures (`average_return`, `total_return`, `avg_win`,
//! `avg_loss`, `largest_win`, `largest_loss`, `max_drawdown`) are percent.
//! Every division is guarded; no metric is ever NaN.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::SimulatedTrade;
use super::timeframe::Timeframe;

/// Gross profit over gross loss, with an explicit infinite sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    Value(f64),
    /// Winning trades and no losing trades.
    Infinite,
}

impl ProfitFactor {
    pub fn as_f64(&self) -> f64 {
        match self {
            ProfitFactor::Value(v) => *v,
            ProfitFactor::Infinite => f64::INFINITY,
        }
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Value(v) => write!(f, "{:.2}", v),
            ProfitFactor::Infinite => f.write_str("inf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: ProfitFactor,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub average_return: f64,
    pub total_return: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
    pub net_profit: f64,
    pub final_equity: f64,
}

impl Metrics {
    pub fn compute(trades: &[SimulatedTrade], timeframe: Timeframe, initial_capital: f64) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_bars = 0usize;
        let mut net_profit = 0.0_f64;

        for trade in trades {
            let ret = trade.pnl_pct;
            if trade.is_win() {
                trades_won += 1;
                total_wins += ret;
                if ret > largest_win {
                    largest_win = ret;
                }
            } else if trade.is_loss() {
                trades_lost += 1;
                total_losses += ret.abs();
                if ret.abs() > largest_loss {
                    largest_loss = ret.abs();
                }
            } else {
                trades_breakeven += 1;
            }
            total_bars += trade.bars_held;
            net_profit += trade.profit;
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            ProfitFactor::Value(total_wins / total_losses)
        } else if total_wins > 0.0 {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Value(0.0)
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_bars_held = if total_trades > 0 {
            total_bars as f64 / total_trades as f64
        } else {
            0.0
        };

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        let average_return = mean(&returns);
        let (total_return, max_drawdown) = compound(&returns);
        let sharpe_ratio = sharpe(&returns, timeframe, avg_bars_held);

        Metrics {
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            sharpe_ratio,
            max_drawdown,
            average_return,
            total_return,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_bars_held,
            net_profit,
            final_equity: initial_capital + net_profit,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Compound percent returns in order from an equity of 1.0.
///
/// Returns (total return %, max drawdown %).
fn compound(returns: &[f64]) -> (f64, f64) {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;

    for r in returns {
        equity *= (1.0 + r / 100.0).max(0.0);
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    ((equity - 1.0) * 100.0, max_dd * 100.0)
}

/// Per-trade Sharpe ratio scaled by the number of holding periods per year.
fn sharpe(returns: &[f64], timeframe: Timeframe, avg_bars_held: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let m = mean(returns);
    let variance = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / returns.len() as f64;
    let stddev = variance.sqrt();
    if stddev <= 0.0 || !stddev.is_finite() {
        return 0.0;
    }
    let trades_per_year = timeframe.periods_per_year() / avg_bars_held.max(1.0);
    (m / stddev) * trades_per_year.sqrt()
}
