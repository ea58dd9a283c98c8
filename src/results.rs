use anyhow::{Context, Result};
use console::Style;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::types::CheckResult;

/// Results in execution order. Append-only while the run is in progress.
#[derive(Debug, Default)]
pub struct ResultLog {
    results: Vec<CheckResult>,
}

impl ResultLog {
    pub fn push(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    /// `passed / (passed + failed)`, 0 for an empty run.
    pub success_rate: f64,
}

impl Summary {
    pub fn from_results(results: &[CheckResult]) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let success_rate = if results.is_empty() {
            0.0
        } else {
            passed as f64 / results.len() as f64
        };
        Summary {
            passed,
            failed,
            success_rate,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Serialize)]
struct Artifact<'a> {
    summary: &'a Summary,
    results: &'a [CheckResult],
}

/// One line per check as it completes, plus the payload for failures.
pub fn print_result(result: &CheckResult) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();

    if result.success {
        println!("{} {} - {}", green.apply_to("PASS"), result.name, result.message);
    } else {
        println!("{} {} - {}", red.apply_to("FAIL"), result.name, result.message);
        if let Some(ref payload) = result.response_payload {
            println!("       Response: {payload}");
        }
    }
}

pub fn print_header(base_url: &str) {
    println!("Starting adoptaunpana.es Backend API Tests ({base_url})");
    println!("{}", "=".repeat(60));
}

pub fn print_summary(summary: &Summary) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();
    let yellow = Style::new().yellow().bold();

    println!();
    println!("{}", "=".repeat(60));
    println!("adoptaunpana.es Backend API Test Results");
    println!("Passed:       {}", green.apply_to(summary.passed));
    println!("Failed:       {}", red.apply_to(summary.failed));
    println!("Success Rate: {:.1}%", summary.success_rate * 100.0);

    if summary.all_passed() {
        println!("{}", green.apply_to("All tests passed! Backend API is working correctly."));
    } else {
        println!("{}", yellow.apply_to("Some tests failed. Check the details above."));
    }
}

/// Write `{summary, results}` as pretty-printed JSON.
pub fn write_json(summary: &Summary, log: &ResultLog, output_path: &Path) -> Result<()> {
    let artifact = Artifact {
        summary,
        results: log.results(),
    };
    let json = serde_json::to_string_pretty(&artifact).context("Failed to serialize results to JSON")?;
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write results to {}", output_path.display()))?;
    Ok(())
}
