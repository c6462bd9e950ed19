//! Configuration validation.
//!
//! Validates all config fields before a run. Every error names the offending
//! section and key. The `read_*` functions return the parsed, validated
//! values so the CLI builders never re-parse.

use crate::domain::error::SignalError;
use crate::domain::execution::RiskConfig;
use crate::domain::indicator::IndicatorKind;
use crate::domain::indicator_set::{IndicatorConfig, IndicatorSet, NormalizationMode, Polarity};
use crate::domain::signal::Thresholds;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveDateTime};

pub const INDICATOR_SECTION_PREFIX: &str = "indicator.";

/// Keys in an indicator section that are not indicator parameters.
const INDICATOR_RESERVED_KEYS: [&str; 3] = ["type", "weight", "polarity"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    validate_pair(config)?;
    read_timeframe(config)?;
    read_window(config)?;
    read_initial_capital(config)?;
    read_warmup_lookback(config)?;
    Ok(())
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    read_thresholds(config)?;
    read_normalization(config)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    read_risk_config(config).map(|_| ())
}

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    read_indicator_set(config)?.validate().map(|_| ())
}

/// Run every section check in file order of importance.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    validate_backtest_config(config)?;
    validate_signal_config(config)?;
    validate_risk_config(config)?;
    validate_indicator_config(config)?;
    Ok(())
}

/// A numeric value, or `None` when the key is absent.
pub fn parse_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, SignalError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => {
            let value: f64 = raw.trim().parse().map_err(|_| {
                SignalError::config_invalid(section, key, format!("'{}' is not a number", raw))
            })?;
            if !value.is_finite() {
                return Err(SignalError::config_invalid(
                    section,
                    key,
                    "must be a finite number",
                ));
            }
            Ok(Some(value))
        }
    }
}

pub fn parse_flag(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<bool>, SignalError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(SignalError::config_invalid(
                section,
                key,
                format!("'{}' is not a boolean", raw),
            )),
        },
    }
}

/// Parse a date or datetime. A bare date means midnight, or 23:59:59 when
/// `end_of_day` is set so an end date covers the whole day.
pub fn parse_datetime(
    value: &str,
    section: &str,
    key: &str,
    end_of_day: bool,
) -> Result<NaiveDateTime, SignalError> {
    let value = value.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
    {
        return Ok(dt);
    }
    let invalid = || {
        SignalError::config_invalid(
            section,
            key,
            format!(
                "invalid {} '{}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
                key, value
            ),
        )
    };
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let dt = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    dt.ok_or_else(invalid)
}

fn validate_pair(config: &dyn ConfigPort) -> Result<(), SignalError> {
    match config.get_string("backtest", "pair") {
        None => Ok(()),
        Some(pair) => check_pair(&pair),
    }
}

/// A pair must be a single non-empty token usable in a file name.
pub fn check_pair(pair: &str) -> Result<(), SignalError> {
    let pair = pair.trim();
    if pair.is_empty() {
        return Err(SignalError::config_invalid(
            "backtest",
            "pair",
            "pair must not be empty",
        ));
    }
    if pair
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\' || c == ',')
    {
        return Err(SignalError::config_invalid(
            "backtest",
            "pair",
            format!("'{}' must not contain whitespace, commas or slashes", pair),
        ));
    }
    Ok(())
}

pub fn read_timeframe(config: &dyn ConfigPort) -> Result<Option<Timeframe>, SignalError> {
    config
        .get_string("backtest", "timeframe")
        .map(|tf| tf.parse::<Timeframe>())
        .transpose()
}

/// The `[backtest]` start and end, both required.
pub fn read_window(config: &dyn ConfigPort) -> Result<(NaiveDateTime, NaiveDateTime), SignalError> {
    let required = |key: &str| {
        config
            .get_string("backtest", key)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SignalError::ConfigMissing {
                section: "backtest".to_string(),
                key: key.to_string(),
            })
    };
    let start = parse_datetime(&required("start")?, "backtest", "start", false)?;
    let end = parse_datetime(&required("end")?, "backtest", "end", true)?;
    if start > end {
        return Err(SignalError::config_invalid(
            "backtest",
            "start",
            "start must not be after end",
        ));
    }
    Ok((start, end))
}

pub fn read_initial_capital(config: &dyn ConfigPort) -> Result<Option<f64>, SignalError> {
    let value = parse_number(config, "backtest", "initial_capital")?;
    if let Some(v) = value {
        if v <= 0.0 {
            return Err(SignalError::config_invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    Ok(value)
}

pub fn read_warmup_lookback(config: &dyn ConfigPort) -> Result<Option<usize>, SignalError> {
    match parse_number(config, "backtest", "warmup_lookback")? {
        None => Ok(None),
        Some(v) if v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as usize)),
        Some(_) => Err(SignalError::config_invalid(
            "backtest",
            "warmup_lookback",
            "warmup_lookback must be a non-negative whole number",
        )),
    }
}

pub fn read_thresholds(config: &dyn ConfigPort) -> Result<Thresholds, SignalError> {
    let defaults = Thresholds::default();
    let thresholds = Thresholds::new(
        parse_number(config, "signal", "buy_threshold")?.unwrap_or(defaults.buy),
        parse_number(config, "signal", "sell_threshold")?.unwrap_or(defaults.sell),
    );
    thresholds.validate()?;
    Ok(thresholds)
}

pub fn read_normalization(config: &dyn ConfigPort) -> Result<NormalizationMode, SignalError> {
    config
        .get_string("signal", "normalization")
        .map(|s| s.parse::<NormalizationMode>())
        .transpose()
        .map(Option::unwrap_or_default)
}

pub fn read_risk_config(config: &dyn ConfigPort) -> Result<RiskConfig, SignalError> {
    let defaults = RiskConfig::default();
    let number = |key: &str, default: f64| -> Result<f64, SignalError> {
        Ok(parse_number(config, "risk", key)?.unwrap_or(default))
    };
    let risk = RiskConfig {
        stop_loss_pct: number("stop_loss_pct", defaults.stop_loss_pct)?,
        risk_reward_ratio: number("risk_reward_ratio", defaults.risk_reward_ratio)?,
        risk_pct: number("risk_pct", defaults.risk_pct)?,
        min_confidence: number("min_confidence", defaults.min_confidence)?,
        allow_shorting: parse_flag(config, "risk", "allow_shorting")?
            .unwrap_or(defaults.allow_shorting),
        slippage_pct: number("slippage_pct", defaults.slippage_pct)?,
        commission_pct: number("commission_pct", defaults.commission_pct)?,
    };
    risk.validate()?;
    Ok(risk)
}

/// `[indicator.*]` section names, sorted.
pub fn indicator_sections(config: &dyn ConfigPort) -> Vec<String> {
    config
        .sections()
        .into_iter()
        .filter(|s| s.starts_with(INDICATOR_SECTION_PREFIX))
        .collect()
}

/// One IndicatorConfig from an `[indicator.<name>]` section.
///
/// `type` defaults to `<name>`; every non-reserved key is a numeric
/// indicator parameter.
pub fn read_indicator_config(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<IndicatorConfig, SignalError> {
    let name = section
        .strip_prefix(INDICATOR_SECTION_PREFIX)
        .unwrap_or(section);
    let type_name = config
        .get_string(section, "type")
        .unwrap_or_else(|| name.to_string());
    let kind: IndicatorKind = type_name.parse().map_err(|_| {
        SignalError::config_invalid(
            section,
            "type",
            format!("unknown indicator type '{}'", type_name),
        )
    })?;

    let weight = parse_number(config, section, "weight")?.unwrap_or(1.0);
    if weight < 0.0 {
        return Err(SignalError::config_invalid(
            section,
            "weight",
            "weight must be non-negative",
        ));
    }

    let polarity = match config.get_string(section, "polarity") {
        None => Polarity::default(),
        Some(raw) => raw.parse::<Polarity>().map_err(|_| {
            SignalError::config_invalid(
                section,
                "polarity",
                format!("'{}' is not a polarity (expected +1 or -1)", raw),
            )
        })?,
    };

    let mut indicator = IndicatorConfig::new(kind, weight).with_polarity(polarity);
    for key in config.keys(section) {
        if INDICATOR_RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(value) = parse_number(config, section, &key)? {
            indicator = indicator.with_param(&key, value);
        }
    }
    indicator.resolve()?;
    Ok(indicator)
}

/// The indicator set from every `[indicator.*]` section plus `[signal]`
/// normalization.
pub fn read_indicator_set(config: &dyn ConfigPort) -> Result<IndicatorSet, SignalError> {
    let sections = indicator_sections(config);
    if sections.is_empty() {
        return Err(SignalError::ConfigMissing {
            section: format!("{}*", INDICATOR_SECTION_PREFIX),
            key: "type".to_string(),
        });
    }
    let configs = sections
        .iter()
        .map(|section| read_indicator_config(config, section))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(IndicatorSet::new(configs).with_normalization(read_normalization(config)?))
}
