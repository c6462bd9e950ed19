#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use signaltrader::domain::backtest::BacktestRequest;
use signaltrader::domain::error::SignalError;
use signaltrader::domain::indicator::IndicatorKind;
use signaltrader::domain::indicator_set::{IndicatorConfig, IndicatorSet};
pub use signaltrader::domain::ohlcv::PriceBar;
use signaltrader::domain::timeframe::Timeframe;
use signaltrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockDataPort {
    pub data: HashMap<(String, Timeframe), Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
    pub fetches: Mutex<Vec<(String, Timeframe, NaiveDateTime, NaiveDateTime)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, pair: &str, timeframe: Timeframe, bars: Vec<PriceBar>) -> Self {
        self.data.insert((pair.to_string(), timeframe), bars);
        self
    }

    pub fn with_error(mut self, pair: &str, reason: &str) -> Self {
        self.errors.insert(pair.to_string(), reason.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

impl DataPort for MockDataPort {
    fn fetch_price_history(
        &self,
        pair: &str,
        timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, SignalError> {
        self.fetches
            .lock()
            .unwrap()
            .push((pair.to_string(), timeframe, start, end));
        if let Some(reason) = self.errors.get(pair) {
            return Err(SignalError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(&(pair.to_string(), timeframe))
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_pairs(&self, timeframe: Timeframe) -> Result<Vec<String>, SignalError> {
        let mut pairs: Vec<String> = self
            .data
            .keys()
            .filter(|(_, tf)| *tf == timeframe)
            .map(|(pair, _)| pair.clone())
            .collect();
        pairs.sort();
        Ok(pairs)
    }
}

/// Hourly timestamps from 2024-01-01 00:00.
pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::hours(i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
    PriceBar {
        timestamp: ts(i),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

pub fn flat_bars(count: usize, price: f64) -> Vec<PriceBar> {
    (0..count)
        .map(|i| make_bar(i, price, price, price, price))
        .collect()
}

/// Bars whose open, high, low and close all equal the given close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c, c, c))
        .collect()
}

/// Bars opening at the previous close with a one-unit range around the close.
pub fn generate_bars(count: usize, start_price: f64, step: f64) -> Vec<PriceBar> {
    (0..count)
        .map(|i| {
            let close = start_price + step * i as f64;
            let open = if i == 0 { close } else { close - step };
            make_bar(i, open, open.max(close) + 0.5, open.min(close) - 0.5, close)
        })
        .collect()
}

/// Single one-bar ROC indicator; a 1% move saturates the score.
pub fn roc_set(saturation: f64) -> IndicatorSet {
    IndicatorSet::new(vec![
        IndicatorConfig::new(IndicatorKind::Roc, 1.0)
            .with_param("period", 1.0)
            .with_param("saturation", saturation),
    ])
}

pub fn mixed_set() -> IndicatorSet {
    IndicatorSet::new(vec![
        IndicatorConfig::new(IndicatorKind::Rsi, 1.0).with_param("period", 5.0),
        IndicatorConfig::new(IndicatorKind::Ema, 0.5).with_param("period", 8.0),
        IndicatorConfig::new(IndicatorKind::Bollinger, 0.5).with_param("period", 6.0),
    ])
}

pub fn request(pair: &str, start: usize, end: usize) -> BacktestRequest {
    BacktestRequest::new(pair, Timeframe::H1, ts(start), ts(end))
}

/// Deterministic zig-zag series for property-free scenario tests.
pub fn wave_bars(count: usize) -> Vec<PriceBar> {
    (0..count)
        .map(|i| {
            let phase = i as f64 * 0.45;
            let close = 100.0 + 5.0 * phase.sin() + 0.05 * i as f64;
            let open = 100.0 + 5.0 * (phase - 0.45).sin() + 0.05 * i as f64;
            make_bar(i, open, open.max(close) + 0.3, open.min(close) - 0.3, close)
        })
        .collect()
}
