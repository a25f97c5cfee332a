//! The polling loop and the strategies it can use to wait between cycles.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tracing::{error, info};

use crate::config::CadenceKind;

/// One unit of work fired by the [`Scheduler`].
#[async_trait]
pub trait Cycle: Send + Sync {
    async fn run_cycle(&self) -> Result<()>;
}

/// Source of the pause between two cycles.
#[async_trait]
pub trait Cadence: Send {
    async fn wait(&mut self);
}

/// Sleeps the full period after every cycle, however long the cycle took.
pub struct FixedDelay {
    period: Duration,
}

impl FixedDelay {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

#[async_trait]
impl Cadence for FixedDelay {
    async fn wait(&mut self) {
        sleep(self.period).await;
    }
}

/// Fires on a fixed-rate ticker; a cycle overrunning its slot pushes the next tick back.
pub struct FixedRate {
    ticker: Interval,
}

impl FixedRate {
    pub fn new(period: Duration) -> Self {
        let now = Instant::now();
        // Periods too long to form a deadline start ticking right away instead of panicking.
        let start = now.checked_add(period).unwrap_or(now);
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }
}

#[async_trait]
impl Cadence for FixedRate {
    async fn wait(&mut self) {
        self.ticker.tick().await;
    }
}

pub fn cadence_for(kind: CadenceKind, period: Duration) -> Box<dyn Cadence> {
    match kind {
        CadenceKind::Sleep => Box::new(FixedDelay::new(period)),
        CadenceKind::Interval => Box::new(FixedRate::new(period)),
    }
}

#[async_trait]
impl Cadence for Box<dyn Cadence> {
    async fn wait(&mut self) {
        self.as_mut().wait().await;
    }
}

pub struct Scheduler<C> {
    cadence: C,
}

impl<C: Cadence> Scheduler<C> {
    pub fn new(cadence: C) -> Self {
        Self { cadence }
    }

    /// Runs `cycle` forever, or until `shutdown` resolves while the loop is waiting.
    ///
    /// A cycle that fails or panics is logged and the loop carries on at the usual cadence.
    /// Shutdown is only observed between cycles, so an in-flight cycle always completes.
    pub async fn run<T: Cycle + ?Sized>(&mut self, cycle: &T, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            match AssertUnwindSafe(cycle.run_cycle()).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(error = %err, "Unexpected error in main loop"),
                Err(panic) => {
                    error!(error = panic_message(&*panic), "Unexpected error in main loop")
                }
            }

            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutting down...");
                    return;
                }
                () = self.cadence.wait() => {}
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("cycle panicked")
}
