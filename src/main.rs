mod checks;
mod cli;
mod config;
#[cfg(test)]
mod fake;
mod http;
mod payloads;
mod progress;
mod results;
mod runner;
mod types;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Exit codes: 0 = all checks passed, 1 = some checks failed, 2 = harness error.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::List => {
            for (i, check) in checks::ALL.iter().enumerate() {
                println!("{:>2}. {:<22} {}", i + 1, check.name(), check.endpoints());
            }
        }
        Commands::Run => {
            let settings = match resolve_settings(&cli) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    std::process::exit(2);
                }
            };
            runner::install_panic_hook();
            match run_checks(&settings).await {
                Ok(summary) if summary.all_passed() || cli.exit_zero => std::process::exit(0),
                Ok(_) => std::process::exit(1),
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    std::process::exit(2);
                }
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("WARNING: could not install log subscriber: {e}");
    }
}

fn resolve_settings(cli: &Cli) -> anyhow::Result<config::Settings> {
    let file = match cli.config {
        Some(ref path) => config::load_config(path)?,
        None => config::Config::default(),
    };
    let overrides = config::Overrides {
        base_url: cli.base_url.clone(),
        output: cli.output.clone(),
        delay_ms: cli.delay_ms,
    };
    Ok(config::resolve(overrides, file))
}

/// Run every check, print the report and persist the results file.
///
/// If the HTTP client cannot be built, every check is recorded as failed and
/// the results file is still written before the error is returned.
async fn run_checks(settings: &config::Settings) -> anyhow::Result<results::Summary> {
    results::print_header(&settings.base_url);

    let transport = match http::HttpTransport::new(&settings.base_url) {
        Ok(transport) => transport,
        Err(e) => {
            let log = runner::unstartable(&format!("{e:#}"));
            finish_report(&log, settings)?;
            return Err(e);
        }
    };
    tracing::debug!(base_url = %settings.base_url, delay_ms = settings.delay.as_millis() as u64, "starting run");

    let log = runner::Runner::new(&transport, settings.delay, settings.timeouts)
        .run()
        .await;
    finish_report(&log, settings)
}

fn finish_report(log: &results::ResultLog, settings: &config::Settings) -> anyhow::Result<results::Summary> {
    let summary = results::Summary::from_results(log.results());
    results::print_summary(&summary);

    results::write_json(&summary, log, &settings.output)?;
    println!("\nDetailed results saved to: {}", settings.output.display());

    Ok(summary)
}
