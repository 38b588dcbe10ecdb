mod check;
mod cli;
mod config;
mod utils;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

use crate::check::report::Overall;
use crate::config::VerifyConfig;
use crate::utils::CancelFlag;

/// Exit status for anything that kept the checks from running at all.
const EXIT_INTERNAL: i32 = 2;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(overall) => overall.exit_code(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_INTERNAL
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<Overall> {
    match cli.command {
        Commands::Verify(args) => {
            let json = args.json;
            let cfg = VerifyConfig::from(args);

            let cancel = CancelFlag::new();
            let handle = cancel.clone();
            ctrlc::set_handler(move || {
                handle.cancel();
                eprintln!("\nCtrl+C received, skipping remaining checks...");
            })
            .context("failed to install Ctrl+C handler")?;

            check::run_verify(&cfg, json, cancel)
                .with_context(|| format!("cannot verify {}", cfg.target))
        }
    }
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
