use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use ticket_watch::checker::AvailabilityChecker;
use ticket_watch::config::{Args, Config, DEFAULT_CONFIG_FILE};
use ticket_watch::exit_err;
use ticket_watch::messaging::TwilioApi;
use ticket_watch::monitor::Monitor;
use ticket_watch::notifier::Notifier;
use ticket_watch::scheduler::{cadence_for, Scheduler};
use ticket_watch::telemetry::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_file = args.config_file.clone();
    let config = Config::load(args);

    // Logging is only configured once the log file location is known.
    let log_file = config.as_ref().ok().and_then(|config| config.log_file.clone());
    init_logging(log_file.as_deref())?;

    let config = match config {
        Ok(config) => config,
        Err(err) => exit_err!(
            1,
            "Failed to load configuration (file {:?}, default {}): {:#}",
            config_file,
            DEFAULT_CONFIG_FILE,
            err
        ),
    };

    let checker = AvailabilityChecker::new(
        config.request_timeout,
        config.accessible_status_codes.clone(),
    )?;
    let notifier = Notifier::new(
        TwilioApi::new(config.messaging_api_base_url.clone())?,
        config.messaging.clone(),
    );
    let monitor = Monitor::new(config.target_url.clone(), checker, notifier);

    info!("Ticket Checker Started. Checking URL: {}", monitor.target_url());
    info!(
        cadence = ?config.cadence,
        allow_set = %config.accessible_status_codes,
        "Check Interval: {} seconds",
        config.check_interval.as_secs()
    );

    let mut scheduler = Scheduler::new(cadence_for(config.cadence, config.check_interval));
    scheduler.run(&monitor, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {}
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}
