use anyhow::{bail, Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use synapse::cli::{Args, OutputFormat};
use synapse::config::AppSettings;
use synapse::output::{self, print_error, print_scan_header, print_success, print_summary};
use synapse::scanner::Scanner;
use synapse::types::{expand_ports, expand_targets};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,synapse=debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(args: Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => AppSettings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AppSettings::load().context("failed to load settings")?,
    };
    let config = args
        .scan_config(&settings)
        .context("invalid scan configuration")?;

    args.check_target_budget(&settings)
        .context("invalid target specification")?;
    let targets = expand_targets(&args.targets).context("invalid target specification")?;
    let ports = expand_ports(&args.ports, config.excluded_ports())
        .context("invalid port specification")?;
    if ports.is_empty() {
        bail!("no ports left to scan");
    }
    debug!(targets = targets.len(), ports = ports.len(), "work set expanded");

    if !args.quiet {
        print_scan_header(targets.len(), ports.len(), &config);
    }

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let show_progress = args.verbose && args.format == OutputFormat::Plain;
    let scanner = Scanner::new(config)
        .with_cancellation(cancel.clone())
        .with_progress(show_progress);

    let started = Instant::now();
    let results = scanner.scan(&targets, &ports).await;
    let elapsed = started.elapsed();

    output::print_results(&results, args.format, args.verbose)
        .context("failed to print results")?;

    if let Some(path) = &args.output {
        output::write_report(path, &results, args.format)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if !args.quiet {
            print_success(&format!("Results saved to {}", path.display()));
        }
    }

    if !args.quiet {
        print_summary(results.len(), elapsed, cancel.is_cancelled());
    }
    Ok(())
}
