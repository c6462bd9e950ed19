//! ADX (Average Directional Index) with +DI and -DI.
//!
//! Wilder's method:
//! - +DM = up move when it exceeds the down move and is positive, else 0
//! - -DM = down move when it exceeds the up move and is positive, else 0
//! - TR, +DM and -DM are Wilder-smoothed over n bars starting at bar 1
//! - ±DI = 100 × smoothed ±DM / smoothed TR
//! - DX = 100 × |+DI − −DI| / (+DI + −DI)
//! - ADX = Wilder average of DX, seeded with the mean of the first n DX values
//!
//! The first DI values appear at bar n and ADX at bar 2n − 1.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::indicator_helpers::{require_period, wilder_from};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_adx(bars: &[PriceBar], period: usize) -> Result<IndicatorSeries, SignalError> {
    require_period("ADX", "period", period)?;

    let len = bars.len();
    let mut tr = vec![0.0; len];
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];

    for i in 1..len {
        let (bar, prev) = (&bars[i], &bars[i - 1]);
        tr[i] = bar.true_range(prev.close);
        let up = bar.high - prev.high;
        let down = prev.low - bar.low;
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let atr = wilder_from(&tr, 1, period);
    let plus_avg = wilder_from(&plus_dm, 1, period);
    let minus_avg = wilder_from(&minus_dm, 1, period);

    let mut plus_di = vec![0.0; len];
    let mut minus_di = vec![0.0; len];
    let mut dx = vec![0.0; len];
    for i in period..len {
        if let (Some(atr), Some(p), Some(m)) = (atr[i], plus_avg[i], minus_avg[i]) {
            if atr > 0.0 {
                plus_di[i] = 100.0 * p / atr;
                minus_di[i] = 100.0 * m / atr;
            }
            let di_sum = plus_di[i] + minus_di[i];
            if di_sum > 0.0 {
                dx[i] = 100.0 * (plus_di[i] - minus_di[i]).abs() / di_sum;
            }
        }
    }

    let adx = wilder_from(&dx, period, period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            timestamp: bar.timestamp,
            value: adx[i].map(|adx| IndicatorValue::Adx {
                adx,
                plus_di: plus_di[i],
                minus_di: minus_di[i],
            }),
        })
        .collect();

    Ok(IndicatorSeries {
        kind: IndicatorKind::Adx,
        values,
    })
}
