//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvTradeReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{
    BacktestConfig, BacktestRequest, BacktestResult, BacktestRunner, DEFAULT_INITIAL_CAPITAL,
    DEFAULT_WARMUP_LOOKBACK,
};
use crate::domain::cancel::CancelToken;
use crate::domain::config_validation::{
    check_pair, read_indicator_set, read_initial_capital, read_risk_config, read_thresholds,
    read_timeframe, read_warmup_lookback, read_window, validate_config,
};
use crate::domain::error::SignalError;
use crate::domain::indicator::catalog::CATALOG;
use crate::domain::indicator_set::IndicatorSet;
use crate::domain::signal::SignalSummary;
use crate::domain::timeframe::Timeframe;
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(
    name = "signaltrader",
    about = "Indicator-weighted trade signals and backtesting"
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest for one pair and timeframe
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        pair: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        /// Report path; `.csv` writes the trade list, anything else JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Emit the signal sequence for the configured window
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        pair: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Backtest many pairs and timeframes in parallel
    Batch {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated pairs; defaults to every pair in the data directory
        #[arg(long)]
        pairs: Option<String>,
        /// Comma-separated timeframes; defaults to [backtest] timeframe
        #[arg(long)]
        timeframes: Option<String>,
        /// Directory for one report per run
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List supported indicators and their parameters
    Catalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ReportFormat::Csv,
            _ => ReportFormat::Json,
        }
    }

    fn adapter(&self) -> Box<dyn ReportPort> {
        match self {
            ReportFormat::Json => Box::new(JsonReportAdapter::new(true)),
            ReportFormat::Csv => Box::new(CsvTradeReportAdapter),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    logging::init(cli.verbose);

    match cli.command {
        Command::Backtest {
            config,
            pair,
            timeframe,
            output,
            data_dir,
        } => run_backtest(
            &config,
            pair.as_deref(),
            timeframe.as_deref(),
            output.as_deref(),
            data_dir.as_deref(),
        ),
        Command::Signals {
            config,
            pair,
            timeframe,
            output,
            data_dir,
        } => run_signals(
            &config,
            pair.as_deref(),
            timeframe.as_deref(),
            output.as_deref(),
            data_dir.as_deref(),
        ),
        Command::Batch {
            config,
            pairs,
            timeframes,
            output,
            format,
            data_dir,
        } => run_batch(
            &config,
            pairs.as_deref(),
            timeframes.as_deref(),
            output.as_deref(),
            format,
            data_dir.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Catalog => run_catalog(),
    }
}

fn fail(err: &SignalError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SignalError> {
    FileConfigAdapter::from_file(path)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SignalError> {
    let config = BacktestConfig {
        thresholds: read_thresholds(adapter)?,
        risk: read_risk_config(adapter)?,
        initial_capital: read_initial_capital(adapter)?.unwrap_or(DEFAULT_INITIAL_CAPITAL),
        warmup_lookback: read_warmup_lookback(adapter)?.unwrap_or(DEFAULT_WARMUP_LOOKBACK),
    };
    config.validate()?;
    Ok(config)
}

pub fn build_indicator_set(adapter: &dyn ConfigPort) -> Result<IndicatorSet, SignalError> {
    let set = read_indicator_set(adapter)?;
    set.validate()?;
    Ok(set)
}

/// One request from `[backtest]`, with command-line overrides taking precedence.
pub fn build_request(
    adapter: &dyn ConfigPort,
    pair_override: Option<&str>,
    timeframe_override: Option<&str>,
) -> Result<BacktestRequest, SignalError> {
    let pair = match pair_override {
        Some(p) => p.trim().to_string(),
        None => adapter
            .get_string("backtest", "pair")
            .ok_or_else(|| SignalError::ConfigMissing {
                section: "backtest".into(),
                key: "pair".into(),
            })?,
    };
    check_pair(&pair)?;

    let timeframe: Timeframe = match timeframe_override {
        Some(tf) => tf.parse()?,
        None => read_timeframe(adapter)?.ok_or_else(|| SignalError::ConfigMissing {
            section: "backtest".into(),
            key: "timeframe".into(),
        })?,
    };

    let (start, end) = read_window(adapter)?;
    Ok(BacktestRequest::new(pair.trim(), timeframe, start, end))
}

/// Cross product of pairs and timeframes, pairs outermost.
pub fn build_requests(
    adapter: &dyn ConfigPort,
    pairs: &[String],
    timeframes: &[Timeframe],
) -> Result<Vec<BacktestRequest>, SignalError> {
    let (start, end) = read_window(adapter)?;
    let mut requests = Vec::with_capacity(pairs.len() * timeframes.len());
    for pair in pairs {
        check_pair(pair)?;
        for &timeframe in timeframes {
            requests.push(BacktestRequest::new(pair, timeframe, start, end));
        }
    }
    Ok(requests)
}

pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn parse_timeframes(value: &str) -> Result<Vec<Timeframe>, SignalError> {
    parse_list(value).iter().map(|tf| tf.parse()).collect()
}

pub fn resolve_data_dir(flag: Option<&Path>, adapter: &dyn ConfigPort) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| adapter.get_string("backtest", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Load, validate and build everything a run needs from one config file.
pub fn prepare(
    config_path: &Path,
) -> Result<(FileConfigAdapter, IndicatorSet, BacktestConfig), SignalError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    let set = build_indicator_set(&adapter)?;
    let config = build_backtest_config(&adapter)?;
    Ok((adapter, set, config))
}

/// Write a report, or print JSON to stdout when no path is given.
pub fn write_report(result: &BacktestResult, output: Option<&Path>) -> Result<(), SignalError> {
    match output {
        Some(path) => {
            ReportFormat::for_path(path).adapter().write(result, path)?;
            eprintln!("\nReport written to: {}", path.display());
        }
        None => println!("{}", JsonReportAdapter::new(true).render(result)?),
    }
    Ok(())
}

pub fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!(
        "\n=== {} {} ({} to {}) ===",
        result.pair, result.timeframe, result.start, result.end
    );
    eprintln!("Bars in window:   {}", result.bars_in_window);
    print_signal_summary(&result.signal_summary);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!(
        "Won/Lost/Even:    {}/{}/{}",
        m.trades_won, m.trades_lost, m.trades_breakeven
    );
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {}", m.profit_factor);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.2}%", m.max_drawdown);
    eprintln!("Average Return:   {:.2}%", m.average_return);
    eprintln!("Total Return:     {:.2}%", m.total_return);
    eprintln!("Net Profit:       {:.2}", m.net_profit);
    eprintln!("Final Equity:     {:.2}", m.final_equity);
}

fn print_signal_summary(summary: &SignalSummary) {
    eprintln!(
        "Signals:          {} ({} buy, {} sell, {} neutral)",
        summary.total, summary.buy, summary.sell, summary.neutral
    );
    eprintln!("Avg Confidence:   {:.3}", summary.average_confidence);
    if let Some(rr) = summary.average_risk_reward {
        eprintln!("Avg Risk/Reward:  {:.2}", rr);
    }
}

fn run_backtest(
    config_path: &Path,
    pair: Option<&str>,
    timeframe: Option<&str>,
    output: Option<&Path>,
    data_dir: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load, validate and build config
    eprintln!("Loading config from {}", config_path.display());
    let (adapter, set, config) = match prepare(config_path) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    // Stage 2: Resolve the request
    let request = match build_request(&adapter, pair, timeframe) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    // Stage 3: Run against the CSV data directory
    let data = CsvAdapter::new(resolve_data_dir(data_dir, &adapter));
    eprintln!(
        "Running backtest: {} {}, {} to {}",
        request.pair, request.timeframe, request.start, request.end
    );
    let result = match BacktestRunner::new(&data).run(&request, &set, &config, &CancelToken::new())
    {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    // Stage 4: Summary and report
    print_summary(&result);
    match write_report(&result, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn run_signals(
    config_path: &Path,
    pair: Option<&str>,
    timeframe: Option<&str>,
    output: Option<&Path>,
    data_dir: Option<&Path>,
) -> ExitCode {
    let (adapter, set, config) = match prepare(config_path) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let request = match build_request(&adapter, pair, timeframe) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    let data = CsvAdapter::new(resolve_data_dir(data_dir, &adapter));
    let signals =
        match BacktestRunner::new(&data).signals(&request, &set, &config, &CancelToken::new()) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };

    eprintln!("\n=== {} {} signals ===", request.pair, request.timeframe);
    print_signal_summary(&SignalSummary::from_signals(&signals));

    let rendered = match JsonReportAdapter::new(true).render_signals(&signals) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    match output {
        Some(path) => match std::fs::write(path, rendered) {
            Ok(()) => {
                eprintln!("\nSignals written to: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(&SignalError::from(e)),
        },
        None => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
    }
}

/// Pairs for a batch: the flag, else `[backtest] pair`, else every pair
/// with data for any requested timeframe.
pub fn resolve_pairs(
    pairs_flag: Option<&str>,
    adapter: &dyn ConfigPort,
    data: &dyn DataPort,
    timeframes: &[Timeframe],
) -> Result<Vec<String>, SignalError> {
    if let Some(flag) = pairs_flag {
        return Ok(parse_list(flag));
    }
    if let Some(pair) = adapter.get_string("backtest", "pair") {
        return Ok(vec![pair.trim().to_string()]);
    }
    let mut pairs = Vec::new();
    for &tf in timeframes {
        for pair in data.list_pairs(tf)? {
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
    }
    pairs.sort();
    Ok(pairs)
}

fn run_batch(
    config_path: &Path,
    pairs: Option<&str>,
    timeframes: Option<&str>,
    output_dir: Option<&Path>,
    format: ReportFormat,
    data_dir: Option<&Path>,
) -> ExitCode {
    let (adapter, set, config) = match prepare(config_path) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let timeframes = match timeframes {
        Some(list) => parse_timeframes(list),
        None => read_timeframe(&adapter).and_then(|tf| {
            tf.map(|tf| vec![tf]).ok_or_else(|| SignalError::ConfigMissing {
                section: "backtest".into(),
                key: "timeframe".into(),
            })
        }),
    };
    let timeframes = match timeframes {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let data = CsvAdapter::new(resolve_data_dir(data_dir, &adapter));
    let requests = match resolve_pairs(pairs, &adapter, &data, &timeframes)
        .and_then(|pairs| build_requests(&adapter, &pairs, &timeframes))
    {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    if requests.is_empty() {
        return fail(&SignalError::ConfigMissing {
            section: "backtest".into(),
            key: "pair".into(),
        });
    }

    eprintln!("Running {} backtests...", requests.len());
    let outcomes =
        BacktestRunner::new(&data).run_batch(&requests, &set, &config, &CancelToken::new());

    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    for (request, outcome) in requests.iter().zip(outcomes) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(
                    pair = %request.pair,
                    timeframe = %request.timeframe,
                    error = %e,
                    "run failed"
                );
                eprintln!(
                    "warning: skipping {} {} ({})",
                    request.pair, request.timeframe, e
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    info!(
        succeeded = results.len(),
        failed = requests.len() - results.len(),
        "batch complete"
    );

    if results.is_empty() {
        return match first_error {
            Some(e) => fail(&e),
            None => ExitCode::SUCCESS,
        };
    }

    eprintln!(
        "\n{:<12} {:>4} {:>7} {:>8} {:>9} {:>8} {:>8}",
        "PAIR", "TF", "TRADES", "WIN%", "RETURN%", "PF", "SHARPE"
    );
    for r in &results {
        eprintln!(
            "{:<12} {:>4} {:>7} {:>8.1} {:>9.2} {:>8} {:>8.2}",
            r.pair,
            r.timeframe.as_str(),
            r.metrics.total_trades,
            r.metrics.win_rate * 100.0,
            r.metrics.total_return,
            r.metrics.profit_factor.to_string(),
            r.metrics.sharpe_ratio
        );
    }

    match output_dir {
        Some(dir) => match format.adapter().write_batch(&results, dir) {
            Ok(paths) => {
                eprintln!("\n{} reports written to: {}", paths.len(), dir.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        },
        None => ExitCode::SUCCESS,
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let (adapter, set, config) = match prepare(config_path) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let warmup = match set.warmup() {
        Ok(w) => w,
        Err(e) => return fail(&e),
    };

    eprintln!("\nIndicators ({}):", set.normalization);
    for indicator in &set.configs {
        let resolved = match indicator.resolve() {
            Ok(r) => r,
            Err(e) => return fail(&e),
        };
        eprintln!(
            "  {:<20} weight {:<6} polarity {:?}",
            resolved.to_string(),
            indicator.weight,
            indicator.polarity
        );
    }
    eprintln!("  warm-up: {} bars", warmup);

    eprintln!("\nSignal thresholds:");
    eprintln!("  buy  >= {}", config.thresholds.buy);
    eprintln!("  sell <= -{}", config.thresholds.sell);

    eprintln!("\nRisk:");
    eprintln!("  stop_loss_pct:     {}", config.risk.stop_loss_pct);
    eprintln!("  risk_reward_ratio: {}", config.risk.risk_reward_ratio);
    eprintln!("  risk_pct:          {}", config.risk.risk_pct);
    eprintln!("  allow_shorting:    {}", config.risk.allow_shorting);

    if let Ok(request) = build_request(&adapter, None, None) {
        eprintln!(
            "\nWindow: {} {}, {} to {}",
            request.pair, request.timeframe, request.start, request.end
        );
        if config.warmup_lookback < warmup {
            eprintln!(
                "warning: warmup_lookback {} is shorter than the {}-bar warm-up",
                config.warmup_lookback, warmup
            );
        }
    }

    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}

fn run_catalog() -> ExitCode {
    for desc in CATALOG {
        println!("{:<12} {}", desc.key, desc.description);
        if !desc.aliases.is_empty() {
            println!("  aliases: {}", desc.aliases.join(", "));
        }
        for param in desc.params {
            let kind = if param.integer { "integer" } else { "number" };
            println!(
                "  {:<12} {:<8} default {:<8} range [{}, {}]",
                param.name, kind, param.default, param.min, param.max
            );
        }
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const CONFIG: &str = "[backtest]\npair = EURUSD\ntimeframe = 1h\nstart = 2024-01-01\nend = 2024-01-31\n[indicator.rsi]\nperiod = 14\n";

    #[test]
    fn cli_parses_backtest_overrides() {
        let cli = Cli::try_parse_from([
            "signaltrader",
            "-vv",
            "backtest",
            "-c",
            "cfg.ini",
            "--pair",
            "GBPUSD",
            "--timeframe",
            "4h",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Backtest {
                pair, timeframe, ..
            } => {
                assert_eq!(pair.as_deref(), Some("GBPUSD"));
                assert_eq!(timeframe.as_deref(), Some("4h"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_parses_batch_format() {
        let cli = Cli::try_parse_from([
            "signaltrader",
            "batch",
            "-c",
            "cfg.ini",
            "--pairs",
            "EURUSD,GBPUSD",
            "--format",
            "csv",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Batch {
                format: ReportFormat::Csv,
                ..
            }
        ));
    }

    #[test]
    fn request_from_config() {
        let request = build_request(&make_config(CONFIG), None, None).unwrap();
        assert_eq!(request.pair, "EURUSD");
        assert_eq!(request.timeframe, Timeframe::H1);
    }

    #[test]
    fn overrides_take_precedence() {
        let request = build_request(&make_config(CONFIG), Some("AUDUSD"), Some("1d")).unwrap();
        assert_eq!(request.pair, "AUDUSD");
        assert_eq!(request.timeframe, Timeframe::D1);
    }

    #[test]
    fn missing_pair_is_reported() {
        let config = make_config("[backtest]\ntimeframe = 1h\nstart = 2024-01-01\nend = 2024-01-31\n");
        let err = build_request(&config, None, None).unwrap_err();
        assert!(matches!(err, SignalError::ConfigMissing { key, .. } if key == "pair"));
    }

    #[test]
    fn config_defaults() {
        let config = build_backtest_config(&make_config(CONFIG)).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn requests_are_pair_major() {
        let pairs = vec!["EURUSD".to_string(), "GBPUSD".to_string()];
        let tfs = vec![Timeframe::H1, Timeframe::H4];
        let requests = build_requests(&make_config(CONFIG), &pairs, &tfs).unwrap();
        let keys: Vec<(String, Timeframe)> = requests
            .into_iter()
            .map(|r| (r.pair, r.timeframe))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("EURUSD".to_string(), Timeframe::H1),
                ("EURUSD".to_string(), Timeframe::H4),
                ("GBPUSD".to_string(), Timeframe::H1),
                ("GBPUSD".to_string(), Timeframe::H4),
            ]
        );
    }

    #[test]
    fn list_parsing_skips_blanks() {
        assert_eq!(parse_list(" EURUSD, ,GBPUSD,"), vec!["EURUSD", "GBPUSD"]);
        assert!(parse_timeframes("1h,3h").is_err());
    }

    #[test]
    fn report_format_from_extension() {
        assert_eq!(ReportFormat::for_path(Path::new("out.CSV")), ReportFormat::Csv);
        assert_eq!(ReportFormat::for_path(Path::new("out.json")), ReportFormat::Json);
        assert_eq!(ReportFormat::for_path(Path::new("out")), ReportFormat::Json);
    }

    #[test]
    fn data_dir_resolution() {
        let config = make_config("[backtest]\ndata_dir = /srv/prices\n");
        assert_eq!(
            resolve_data_dir(None, &config),
            PathBuf::from("/srv/prices")
        );
        assert_eq!(
            resolve_data_dir(Some(Path::new("here")), &config),
            PathBuf::from("here")
        );
        assert_eq!(
            resolve_data_dir(None, &make_config("[backtest]\n")),
            PathBuf::from(DEFAULT_DATA_DIR)
        );
    }
}
