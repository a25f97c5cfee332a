use std::collections::BTreeSet;
use std::fmt::Display;
use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::{error, info};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Status codes that count as "the page exists".
///
/// 403 is part of the default set on purpose: the ticket site answers with it while the sale
/// page is published but gated, so it signals availability rather than absence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessibleStatusCodes(BTreeSet<u16>);

impl Default for AccessibleStatusCodes {
    fn default() -> Self {
        Self(BTreeSet::from([200, 201, 203, 204, 403]))
    }
}

impl AccessibleStatusCodes {
    pub fn new(codes: impl IntoIterator<Item = u16>) -> Result<Self> {
        let codes: BTreeSet<u16> = codes.into_iter().collect();
        if codes.is_empty() {
            bail!("The accessible status code set must not be empty");
        }
        if let Some(invalid) = codes.iter().find(|code| StatusCode::from_u16(**code).is_err()) {
            bail!("{} is not a valid HTTP status code", invalid);
        }
        Ok(Self(codes))
    }

    pub fn contains(&self, status: StatusCode) -> bool {
        self.0.contains(&status.as_u16())
    }
}

impl Display for AccessibleStatusCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let codes: Vec<String> = self.0.iter().map(u16::to_string).collect();
        write!(f, "{}", codes.join(","))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConnectionError,
    Timeout,
    RequestException,
}

impl FailureKind {
    fn classify(err: &reqwest::Error) -> Self {
        // A connect timeout reports both, the timeout wins.
        if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() {
            FailureKind::ConnectionError
        } else {
            FailureKind::RequestException
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::ConnectionError => write!(f, "connection error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RequestException => write!(f, "request exception"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub kind: FailureKind,
    pub details: String,
}

/// Outcome of a single poll. Either `status_code` or `failure` is set, never both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<CheckFailure>,
}

impl CheckResult {
    fn completed(status: StatusCode, accessible_codes: &AccessibleStatusCodes) -> Self {
        Self {
            accessible: accessible_codes.contains(status),
            status_code: Some(status.as_u16()),
            reason: status.canonical_reason().map(str::to_string),
            failure: None,
        }
    }

    fn failed(kind: FailureKind, details: String) -> Self {
        Self {
            accessible: false,
            status_code: None,
            reason: None,
            failure: Some(CheckFailure { kind, details }),
        }
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|failure| format!("{}: {}", failure.kind, failure.details))
    }

    pub(crate) fn log(&self, url: &Url) {
        info!(
            %url,
            accessible = self.accessible,
            status_code = self.status_code,
            reason = self.reason.as_deref(),
            failure = self.failure_reason().as_deref(),
            "URL check result"
        );
    }
}

/// Issues the GET request against the watched page and classifies the answer.
#[derive(Clone, Debug)]
pub struct AvailabilityChecker {
    client: Client,
    accessible_codes: AccessibleStatusCodes,
}

impl AvailabilityChecker {
    pub fn new(timeout: Duration, accessible_codes: AccessibleStatusCodes) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            accessible_codes,
        })
    }

    /// Never fails: transport errors are folded into the returned [`CheckResult`].
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn check(&self, url: &Url) -> CheckResult {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, BROWSER_ACCEPT)
            .send()
            .await;

        let result = match response {
            Ok(response) => CheckResult::completed(response.status(), &self.accessible_codes),
            Err(err) => {
                let kind = FailureKind::classify(&err);
                let details = format!("{:#}", anyhow::Error::from(err));
                error!(category = %kind, %details, "URL check failed");
                CheckResult::failed(kind, details)
            }
        };

        result.log(url);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allow_set_should_treat_forbidden_as_accessible() {
        let codes = AccessibleStatusCodes::default();

        for code in [200, 201, 203, 204, 403] {
            assert!(codes.contains(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [202, 301, 401, 404, 500, 503] {
            assert!(!codes.contains(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn allow_set_should_reject_an_empty_set() {
        assert!(AccessibleStatusCodes::new(Vec::new()).is_err());
    }

    #[test]
    fn allow_set_should_reject_out_of_range_codes() {
        assert!(AccessibleStatusCodes::new([200, 1000]).is_err());
    }

    #[test]
    fn allow_set_should_display_as_a_comma_separated_list() {
        assert_eq!(AccessibleStatusCodes::default().to_string(), "200,201,203,204,403");
    }

    #[test]
    fn completed_result_should_carry_status_and_reason() {
        let result = CheckResult::completed(StatusCode::FORBIDDEN, &AccessibleStatusCodes::default());

        assert!(result.accessible);
        assert_eq!(result.status_code, Some(403));
        assert_eq!(result.reason.as_deref(), Some("Forbidden"));
        assert!(result.failure_reason().is_none());
    }

    #[test]
    fn failed_result_should_render_category_and_details() {
        let result = CheckResult::failed(FailureKind::Timeout, "operation timed out".into());

        assert!(!result.accessible);
        assert!(result.status_code.is_none());
        assert_eq!(
            result.failure_reason().as_deref(),
            Some("timeout: operation timed out")
        );
    }

    #[test]
    fn result_should_serialize_only_the_fields_that_are_present() {
        let result = CheckResult::failed(FailureKind::ConnectionError, "refused".into());

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "accessible": false,
                "failure": { "kind": "connection_error", "details": "refused" }
            })
        );
    }
}
