use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use tracing::info;

use crate::checker::{AvailabilityChecker, CheckResult};
use crate::messaging::MessagingApi;
use crate::notifier::Notifier;
use crate::scheduler::Cycle;

/// Checks the target page and notifies when it is accessible.
pub struct Monitor<A> {
    target_url: Url,
    checker: AvailabilityChecker,
    notifier: Notifier<A>,
}

impl<A: MessagingApi> Monitor<A> {
    pub fn new(target_url: Url, checker: AvailabilityChecker, notifier: Notifier<A>) -> Self {
        Self {
            target_url,
            checker,
            notifier,
        }
    }

    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    pub fn notifier(&self) -> &Notifier<A> {
        &self.notifier
    }

    pub async fn check_and_notify(&self) -> CheckResult {
        info!("Performing URL check...");
        let result = self.checker.check(&self.target_url).await;

        if result.accessible {
            self.notifier.notify(&self.target_url).await;
        }
        result
    }
}

#[async_trait]
impl<A: MessagingApi> Cycle for Monitor<A> {
    async fn run_cycle(&self) -> Result<()> {
        self.check_and_notify().await;
        Ok(())
    }
}
