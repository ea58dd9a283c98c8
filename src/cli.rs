use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "adopta-api-check",
    version,
    about = "Run the adoptaunpana.es backend API checks against a live server"
)]
pub struct Cli {
    /// Enable verbose output (request-level logging on stderr)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// TOML config file with base_url, output, delay_ms and [timeouts]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the API under test (default: http://localhost:3000/api)
    #[arg(long, global = true, env = "ADOPTA_API_URL")]
    pub base_url: Option<String>,

    /// Where to write the JSON results (default: backend_test_results.json)
    #[arg(long, global = true, env = "ADOPTA_RESULTS_PATH")]
    pub output: Option<PathBuf>,

    /// Pause between checks in milliseconds (default: 500)
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    /// Exit 0 after a completed run even when checks failed
    #[arg(long, global = true)]
    pub exit_zero: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run all checks in order and write the results file (default)
    Run,

    /// List the checks in execution order with the endpoints they hit
    List,
}
