//! Market-data collaborator port.

use chrono::NaiveDateTime;

use crate::domain::error::SignalError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::timeframe::Timeframe;

pub trait DataPort {
    /// Bars for `pair` with `start <= timestamp <= end`, oldest first.
    ///
    /// May return fewer bars than the range spans; gaps are never padded.
    fn fetch_price_history(
        &self,
        pair: &str,
        timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, SignalError>;

    fn list_pairs(&self, timeframe: Timeframe) -> Result<Vec<String>, SignalError>;
}
