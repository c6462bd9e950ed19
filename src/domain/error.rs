//! Domain error types.
//!
//! Every failure the engine can surface is a variant of [`SignalError`].
//! Numeric edge cases in the metrics are not errors; they resolve to
//! documented sentinel values instead.

/// Top-level error type for signaltrader.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("invalid parameter {parameter} for {indicator}: {reason}")]
    InvalidParameter {
        indicator: String,
        parameter: String,
        reason: String,
    },

    #[error("insufficient history: have {bars} bars, need at least {required}")]
    InsufficientHistory { bars: usize, required: usize },

    #[error("empty price series{}", series_label(.pair, .timeframe))]
    EmptyPriceSeries { pair: String, timeframe: String },

    #[error("inconsistent indicator configuration: {reason}")]
    InconsistentConfiguration { reason: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn series_label(pair: &str, timeframe: &str) -> String {
    if pair.is_empty() {
        String::new()
    } else {
        format!(" for {} ({})", pair, timeframe)
    }
}

impl SignalError {
    pub fn invalid_parameter(indicator: &str, parameter: &str, reason: impl Into<String>) -> Self {
        SignalError::InvalidParameter {
            indicator: indicator.to_string(),
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SignalError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SignalError> for std::process::ExitCode {
    fn from(err: &SignalError) -> Self {
        let code: u8 = match err {
            SignalError::Io(_) | SignalError::Report { .. } => 1,
            SignalError::ConfigParse { .. }
            | SignalError::ConfigMissing { .. }
            | SignalError::ConfigInvalid { .. } => 2,
            SignalError::Data { .. } | SignalError::EmptyPriceSeries { .. } => 3,
            SignalError::InvalidParameter { .. }
            | SignalError::InconsistentConfiguration { .. } => 4,
            SignalError::InsufficientHistory { .. } => 5,
            SignalError::Cancelled => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_display() {
        let err = SignalError::invalid_parameter("RSI", "period", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter period for RSI: must be at least 1"
        );
    }

    #[test]
    fn insufficient_history_display() {
        let err = SignalError::InsufficientHistory {
            bars: 20,
            required: 28,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history: have 20 bars, need at least 28"
        );
    }

    #[test]
    fn empty_series_is_distinct_from_insufficient_history() {
        let empty = SignalError::EmptyPriceSeries {
            pair: "EURUSD".into(),
            timeframe: "1h".into(),
        };
        let short = SignalError::InsufficientHistory {
            bars: 3,
            required: 14,
        };
        assert_ne!(
            format!("{:?}", std::process::ExitCode::from(&empty)),
            format!("{:?}", std::process::ExitCode::from(&short))
        );
        assert_ne!(empty.to_string(), short.to_string());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SignalError = io.into();
        assert!(matches!(err, SignalError::Io(_)));
    }
}
