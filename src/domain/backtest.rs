//! Backtest orchestration: scores, signals, simulation, metrics.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use super::cancel::CancelToken;
use super::error::SignalError;
use super::execution::{RiskConfig, TradeSimulator};
use super::indicator_set::IndicatorSet;
use super::metrics::Metrics;
use super::ohlcv::PriceBar;
use super::position::SimulatedTrade;
use super::signal::{signals_for_window, Signal, SignalSummary, Thresholds};
use super::timeframe::Timeframe;
use crate::ports::data_port::DataPort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_WARMUP_LOOKBACK: usize = 200;

/// Everything a run needs besides data and indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub thresholds: Thresholds,
    pub risk: RiskConfig,
    pub initial_capital: f64,
    /// Bars fetched before the window start to warm indicators up.
    pub warmup_lookback: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            thresholds: Thresholds::default(),
            risk: RiskConfig::default(),
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            warmup_lookback: DEFAULT_WARMUP_LOOKBACK,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        self.thresholds.validate()?;
        self.risk.validate()?;
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(SignalError::config_invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub pair: String,
    pub timeframe: Timeframe,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BacktestRequest {
    pub fn new(pair: &str, timeframe: Timeframe, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        BacktestRequest {
            pair: pair.to_string(),
            timeframe,
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub pair: String,
    pub timeframe: Timeframe,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub indicator_set: IndicatorSet,
    pub config: BacktestConfig,
    pub bars_in_window: usize,
    pub signal_summary: SignalSummary,
    pub trades: Vec<SimulatedTrade>,
    pub metrics: Metrics,
}

/// Index range of the bars inside [start, end].
fn locate_window(
    bars: &[PriceBar],
    request: &BacktestRequest,
) -> Result<(usize, usize), SignalError> {
    let empty = || SignalError::EmptyPriceSeries {
        pair: request.pair.clone(),
        timeframe: request.timeframe.to_string(),
    };
    if bars.is_empty() {
        return Err(empty());
    }

    let window_start = bars
        .iter()
        .position(|b| b.timestamp >= request.start)
        .ok_or_else(empty)?;
    let window_end = bars
        .iter()
        .rposition(|b| b.timestamp <= request.end)
        .filter(|&end| end >= window_start)
        .ok_or_else(empty)?;
    Ok((window_start, window_end))
}

/// Signals for the bars inside the request window, warmed by any earlier
/// bars in `bars`. Bars without a composite score yield no signal.
pub fn window_signals(
    bars: &[PriceBar],
    request: &BacktestRequest,
    set: &IndicatorSet,
    thresholds: &Thresholds,
    cancel: &CancelToken,
) -> Result<Vec<Signal>, SignalError> {
    let (window_start, window_end) = locate_window(bars, request)?;
    signals_for_window(&bars[..=window_end], window_start, set, thresholds, cancel)
}

/// Run one backtest over `bars`, which may include warm-up history before
/// `request.start`. Only bars inside [start, end] emit signals and trade.
pub fn run_backtest(
    bars: &[PriceBar],
    request: &BacktestRequest,
    set: &IndicatorSet,
    config: &BacktestConfig,
    cancel: &CancelToken,
) -> Result<BacktestResult, SignalError> {
    let span = info_span!("backtest", pair = %request.pair, timeframe = %request.timeframe);
    let _guard = span.enter();

    config.validate()?;
    set.validate()?;
    if request.start > request.end {
        return Err(SignalError::config_invalid(
            "backtest",
            "start",
            "start must not be after end",
        ));
    }

    let (window_start, window_end) = locate_window(bars, request)?;

    let signals = signals_for_window(
        &bars[..=window_end],
        window_start,
        set,
        &config.thresholds,
        cancel,
    )?;
    let window = &bars[window_start..=window_end];
    let simulator = TradeSimulator::new(config.risk.clone(), config.initial_capital);
    let outcome = simulator.simulate(window, &signals, cancel)?;
    let metrics = Metrics::compute(&outcome.trades, request.timeframe, config.initial_capital);

    info!(
        bars = window.len(),
        signals = signals.len(),
        trades = metrics.total_trades,
        win_rate = metrics.win_rate,
        "backtest complete"
    );

    Ok(BacktestResult {
        pair: request.pair.clone(),
        timeframe: request.timeframe,
        start: request.start,
        end: request.end,
        indicator_set: set.clone(),
        config: config.clone(),
        bars_in_window: window.len(),
        signal_summary: SignalSummary::from_signals(&signals),
        trades: outcome.trades,
        metrics,
    })
}

/// Runs backtests against a data collaborator.
pub struct BacktestRunner<'a, D: DataPort + ?Sized> {
    data: &'a D,
}

impl<'a, D: DataPort + ?Sized> BacktestRunner<'a, D> {
    pub fn new(data: &'a D) -> Self {
        BacktestRunner { data }
    }

    /// History for the request plus `warmup_lookback` bars before its start.
    pub fn fetch(
        &self,
        request: &BacktestRequest,
        warmup_lookback: usize,
    ) -> Result<Vec<PriceBar>, SignalError> {
        let fetch_start = i32::try_from(warmup_lookback)
            .ok()
            .and_then(|n| request.timeframe.duration().checked_mul(n))
            .and_then(|lookback| request.start.checked_sub_signed(lookback))
            .unwrap_or(NaiveDateTime::MIN);
        let bars = self.data.fetch_price_history(
            &request.pair,
            request.timeframe,
            fetch_start,
            request.end,
        )?;
        info!(
            pair = %request.pair,
            timeframe = %request.timeframe,
            bars = bars.len(),
            "fetched price history"
        );
        Ok(bars)
    }

    /// Fetch history including the warm-up lookback, then run.
    pub fn run(
        &self,
        request: &BacktestRequest,
        set: &IndicatorSet,
        config: &BacktestConfig,
        cancel: &CancelToken,
    ) -> Result<BacktestResult, SignalError> {
        config.validate()?;
        let bars = self.fetch(request, config.warmup_lookback)?;
        run_backtest(&bars, request, set, config, cancel)
    }

    /// Fetch history including the warm-up lookback, then emit window signals.
    pub fn signals(
        &self,
        request: &BacktestRequest,
        set: &IndicatorSet,
        config: &BacktestConfig,
        cancel: &CancelToken,
    ) -> Result<Vec<Signal>, SignalError> {
        let bars = self.fetch(request, config.warmup_lookback)?;
        window_signals(&bars, request, set, &config.thresholds, cancel)
    }
}

impl<'a, D: DataPort + Sync + ?Sized> BacktestRunner<'a, D> {
    /// Run every request in parallel; results keep the input order.
    pub fn run_batch(
        &self,
        requests: &[BacktestRequest],
        set: &IndicatorSet,
        config: &BacktestConfig,
        cancel: &CancelToken,
    ) -> Vec<Result<BacktestResult, SignalError>> {
        requests
            .par_iter()
            .map(|request| self.run(request, set, config, cancel))
            .collect()
    }
}
