//! JSON report adapter implementing ReportPort.
//!
//! Writes the full BacktestResult, including the profit-factor sentinel,
//! so it reads back losslessly with [`read_result`].

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SignalError;
use crate::domain::signal::Signal;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter {
    pub pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn render(&self, result: &BacktestResult) -> Result<String, SignalError> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(result)
        } else {
            serde_json::to_string(result)
        };
        rendered.map_err(|e| SignalError::Report {
            reason: format!("failed to serialise result: {}", e),
        })
    }

    pub fn render_signals(&self, signals: &[Signal]) -> Result<String, SignalError> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(signals)
        } else {
            serde_json::to_string(signals)
        };
        rendered.map_err(|e| SignalError::Report {
            reason: format!("failed to serialise signals: {}", e),
        })
    }
}

impl ReportPort for JsonReportAdapter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SignalError> {
        let content = self.render(result)?;
        fs::write(output_path, content).map_err(|e| SignalError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })
    }
}

pub fn read_result(path: &Path) -> Result<BacktestResult, SignalError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| SignalError::Report {
        reason: format!("failed to parse {}: {}", path.display(), e),
    })
}
