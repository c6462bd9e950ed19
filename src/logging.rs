//! Tracing subscriber setup for the command-line driver.
//!
//! The library only emits events; installing a subscriber is left to the
//! binary so embedding applications keep control of their own output.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Default filter directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install a stderr fmt subscriber. `RUST_LOG` overrides the verbosity.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("signaltrader={}", level_for(verbosity))));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(7), "trace");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(0);
        init(2);
    }
}
