//! CSV trade-list report adapter implementing ReportPort.
//!
//! One row per SimulatedTrade; aggregate metrics are not included.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SignalError;
use crate::ports::report_port::ReportPort;

const HEADER: [&str; 12] = [
    "direction",
    "entry_time",
    "entry_price",
    "exit_time",
    "exit_price",
    "exit_reason",
    "quantity",
    "pnl",
    "pnl_pct",
    "profit",
    "commission",
    "bars_held",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTradeReportAdapter;

fn report_error(e: impl std::fmt::Display) -> SignalError {
    SignalError::Report {
        reason: format!("failed to write trade list: {}", e),
    }
}

impl ReportPort for CsvTradeReportAdapter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SignalError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(report_error)?;
        wtr.write_record(HEADER).map_err(report_error)?;
        for trade in &result.trades {
            wtr.write_record([
                trade.direction.to_string(),
                trade.entry_time.to_string(),
                trade.entry_price.to_string(),
                trade.exit_time.to_string(),
                trade.exit_price.to_string(),
                trade.exit_reason.to_string(),
                trade.quantity.to_string(),
                trade.pnl.to_string(),
                trade.pnl_pct.to_string(),
                trade.profit.to_string(),
                trade.commission.to_string(),
                trade.bars_held.to_string(),
            ])
            .map_err(report_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
