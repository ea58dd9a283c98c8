use std::any::Any;
use std::panic::{AssertUnwindSafe, Location};
use std::time::Duration;

use futures::FutureExt;

use crate::checks::{self, CheckKind};
use crate::config::Timeouts;
use crate::http::Transport;
use crate::progress::{check_spinner, finish_spinner};
use crate::results::{self, ResultLog};
use crate::types::{CheckResult, Fault};

/// State shared between checks for the duration of one run.
#[derive(Debug)]
pub struct RunContext {
    pub timeouts: Timeouts,
    /// Set by "Create Dog Listing", read by the checks that need an existing listing.
    pub created_listing_id: Option<String>,
    /// Set by "Send Message".
    pub created_message_id: Option<String>,
}

impl RunContext {
    pub fn new(timeouts: Timeouts) -> Self {
        RunContext {
            timeouts,
            created_listing_id: None,
            created_message_id: None,
        }
    }
}

/// Runs every check once, strictly in order, pausing `delay` between checks.
pub struct Runner<'a, T> {
    transport: &'a T,
    delay: Duration,
    timeouts: Timeouts,
}

impl<'a, T: Transport> Runner<'a, T> {
    pub fn new(transport: &'a T, delay: Duration, timeouts: Timeouts) -> Self {
        Runner {
            transport,
            delay,
            timeouts,
        }
    }

    pub async fn run(&self) -> ResultLog {
        let mut ctx = RunContext::new(self.timeouts);
        let mut log = ResultLog::default();

        for (index, check) in checks::ALL.iter().copied().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let pb = check_spinner(check.name());
            let result = self.run_check(check, &mut ctx).await;
            finish_spinner(&pb);

            results::print_result(&result);
            log.push(result);
        }

        log
    }

    async fn run_check(&self, check: CheckKind, ctx: &mut RunContext) -> CheckResult {
        // Last line of defense: a panic inside a check becomes a failing result.
        let outcome = AssertUnwindSafe(check.run(ctx, self.transport))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(passed)) => CheckResult::passed(check.name(), passed),
            Ok(Err(fault)) => {
                tracing::warn!(check = check.name(), kind = %fault.kind(), "{fault}");
                CheckResult::failed(check.name(), fault)
            }
            Err(panic) => {
                let detail = panic_message(&*panic);
                tracing::error!(check = check.name(), "check panicked: {detail}");
                CheckResult::failed(check.name(), Fault::Internal(detail))
            }
        }
    }
}

/// Results for a run that could not start: every check fails with `reason`.
pub fn unstartable(reason: &str) -> ResultLog {
    let mut log = ResultLog::default();
    for check in checks::ALL {
        let result = CheckResult::failed(
            check.name(),
            Fault::Internal(format!("HTTP client unavailable: {reason}")),
        );
        results::print_result(&result);
        log.push(result);
    }
    log
}

/// Send panic reports through the log subscriber instead of raw stderr, so a
/// contained check panic shows up as one log line next to its FAIL line.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("{}", panic_report(info.payload(), info.location()));
    }));
}

fn panic_report(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> String {
    match location {
        Some(loc) => format!("panicked at {}:{}: {}", loc.file(), loc.line(), panic_message(payload)),
        None => format!("panicked: {}", panic_message(payload)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "check panicked".to_string()
    }
}
