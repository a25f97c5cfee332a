use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;

use ticket_watch::checker::{
    AccessibleStatusCodes, AvailabilityChecker, CheckResult, DEFAULT_REQUEST_TIMEOUT,
};
use ticket_watch::telemetry::init_logging;

/// Check a URL once and exit with 0 when it is accessible, 1 otherwise
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The URL to check
    url: Url,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(None)?;

    let checker = AvailabilityChecker::new(DEFAULT_REQUEST_TIMEOUT, AccessibleStatusCodes::default())
        .context("Failed to build the HTTP client")?;
    let result = checker.check(&args.url).await;

    Ok(ExitCode::from(exit_status(&result)))
}

fn exit_status(result: &CheckResult) -> u8 {
    if result.accessible {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use ticket_watch::checker::{CheckFailure, FailureKind};

    use super::*;

    #[test]
    fn an_accessible_page_should_exit_successfully() {
        let result = CheckResult {
            accessible: true,
            status_code: Some(403),
            reason: Some("Forbidden".into()),
            failure: None,
        };

        assert_eq!(exit_status(&result), 0);
    }

    #[test]
    fn a_missing_page_should_exit_with_failure() {
        let result = CheckResult {
            accessible: false,
            status_code: Some(404),
            reason: Some("Not Found".into()),
            failure: None,
        };

        assert_eq!(exit_status(&result), 1);
    }

    #[test]
    fn a_transport_failure_should_exit_with_failure() {
        let result = CheckResult {
            accessible: false,
            status_code: None,
            reason: None,
            failure: Some(CheckFailure {
                kind: FailureKind::Timeout,
                details: "operation timed out".into(),
            }),
        };

        assert_eq!(exit_status(&result), 1);
    }
}
