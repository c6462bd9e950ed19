//! Result hand-off port.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SignalError;

/// Port for writing backtest results.
pub trait ReportPort {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SignalError>;

    /// Default implementation: one file per result named `<PAIR>_<timeframe>`.
    fn write_batch(
        &self,
        results: &[BacktestResult],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SignalError> {
        std::fs::create_dir_all(output_dir)?;
        let mut written = Vec::with_capacity(results.len());
        for result in results {
            let path = output_dir.join(format!(
                "{}_{}.{}",
                result.pair,
                result.timeframe,
                self.extension()
            ));
            self.write(result, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}
