//! Bar timeframes and their annualisation constants.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SignalError;

const MINUTES_PER_YEAR: f64 = 365.0 * 24.0 * 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
    #[serde(rename = "1mo")]
    Mo1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 9] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::Mo1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
            Timeframe::Mo1 => "1mo",
        }
    }

    /// Nominal bar length. A month is taken as 30 days.
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1_440,
            Timeframe::W1 => 10_080,
            Timeframe::Mo1 => 43_200,
        }
    }

    /// Bars per year on a continuously traded market.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Timeframe::D1 => 365.0,
            Timeframe::W1 => 52.0,
            Timeframe::Mo1 => 12.0,
            intraday => MINUTES_PER_YEAR / intraday.minutes() as f64,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let tf = match normalized.as_str() {
            "1m" => Timeframe::M1,
            "5m" => Timeframe::M5,
            "15m" => Timeframe::M15,
            "30m" => Timeframe::M30,
            "1h" => Timeframe::H1,
            "4h" => Timeframe::H4,
            "1d" | "daily" => Timeframe::D1,
            "1w" | "weekly" => Timeframe::W1,
            "1mo" | "monthly" => Timeframe::Mo1,
            _ => {
                return Err(SignalError::config_invalid(
                    "backtest",
                    "timeframe",
                    format!("unknown timeframe '{}'", s),
                ));
            }
        };
        Ok(tf)
    }
}
