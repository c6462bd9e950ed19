use clap::Parser;
use signaltrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
