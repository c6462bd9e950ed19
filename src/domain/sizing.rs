//! Position sizing policies.

use std::fmt::Debug;

/// Decides how many units to open given current equity and risk.
pub trait PositionSizer: Debug + Send + Sync {
    /// `stop_distance` is the absolute price distance to the stop, if any.
    fn quantity(&self, equity: f64, entry_price: f64, stop_distance: Option<f64>) -> f64;
}

/// Risk a fixed percentage of equity per trade.
///
/// With a stop, quantity = equity × risk% / stop distance, capped so the
/// notional never exceeds equity. Without a stop, the notional itself is
/// equity × risk%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFractional {
    pub risk_pct: f64,
}

impl PositionSizer for FixedFractional {
    fn quantity(&self, equity: f64, entry_price: f64, stop_distance: Option<f64>) -> f64 {
        if equity <= 0.0 || entry_price <= 0.0 || self.risk_pct <= 0.0 {
            return 0.0;
        }
        let risk_amount = equity * self.risk_pct / 100.0;
        let max_quantity = equity / entry_price;
        match stop_distance {
            Some(distance) if distance > 0.0 => (risk_amount / distance).min(max_quantity),
            _ => risk_amount / entry_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn risk_over_stop_distance() {
        let sizer = FixedFractional { risk_pct: 1.0 };
        // risk 100 over a 2.0 stop distance
        assert_relative_eq!(sizer.quantity(10_000.0, 100.0, Some(2.0)), 50.0);
    }

    #[test]
    fn capped_at_full_equity() {
        let sizer = FixedFractional { risk_pct: 5.0 };
        // 500 / 0.01 would be 50_000 units; equity buys only 100
        assert_relative_eq!(sizer.quantity(10_000.0, 100.0, Some(0.01)), 100.0);
    }

    #[test]
    fn no_stop_uses_notional() {
        let sizer = FixedFractional { risk_pct: 10.0 };
        assert_relative_eq!(sizer.quantity(10_000.0, 50.0, None), 20.0);
    }

    #[test]
    fn nothing_to_risk() {
        let sizer = FixedFractional { risk_pct: 1.0 };
        assert_eq!(sizer.quantity(0.0, 100.0, Some(1.0)), 0.0);
        assert_eq!(sizer.quantity(1000.0, 0.0, Some(1.0)), 0.0);
    }
}
