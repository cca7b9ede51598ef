//! # Surf Alert Application Entry Point
//!
//! One invocation runs one cycle: load config, fetch the forecast, evaluate
//! tomorrow, deliver the report, exit. Meant to be fired once a day by cron,
//! a systemd timer, or a hosted scheduler.
//!
//! Exit codes: 0 on success (including "no surf"), 1 fetch failure,
//! 2 evaluation failure, 3 delivery failure, 4 bad configuration,
//! 5 async runtime could not start.


use chrono::Utc;
use std::env;
use std::process::ExitCode;
use surf_alert_lib::config::{self, Config};
use surf_alert_lib::forecast::ForecastClient;
use surf_alert_lib::pipeline::{self, Outcome, RunError};
use surf_alert_lib::{evaluator, notifier};

/// Main application entry point.
fn main() -> ExitCode {
    // Local overrides first so RUST_LOG from .env applies too
    let overridden = config::load_env_override(config::ENV_FILE);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match overridden {
        Ok(true) => log::info!("Applied local overrides from {}", config::ENV_FILE),
        Ok(false) => {}
        Err(error) => {
            let error = RunError::from(error);
            log::error!("❌ {}", error);
            return error.exit_code();
        }
    }

    // Development mode: print instead of emailing
    let console_only = env::args().any(|arg| arg == "--stdout");

    match run(console_only) {
        Ok(outcome) => {
            let verdict = if outcome.evaluation.is_alert() {
                "surf's up"
            } else {
                "no surf"
            };
            log::info!("Done: {} for {}", verdict, outcome.evaluation.date());
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("❌ {}", error);
            error.exit_code()
        }
    }
}

fn run(console_only: bool) -> Result<Outcome, RunError> {
    let config = Config::load()?;
    let tz = config.timezone()?;
    let target = evaluator::target_date(tz, Utc::now());

    log::info!(
        "Checking surf conditions for {} on {}...",
        config.location.name,
        target
    );
    log::info!("Alert threshold: {}m", config.alert.threshold_m);

    let notifier = notifier::from_config(&config, console_only)?;
    let client = ForecastClient::new(&config.api)?;

    // Single-threaded runtime for the async HTTP client
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(RunError::Runtime)?;

    let days = rt.block_on(client.fetch_forecast(
        config.location.latitude,
        config.location.longitude,
        config.alert.forecast_days,
        &config.location.timezone,
    ))?;

    pipeline::process(&days, target, &config, notifier.as_ref())
}
