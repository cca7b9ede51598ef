//! One evaluation cycle after the forecast is in: evaluate, format, deliver.
//!
//! The fetch itself happens in the binary (it owns the async runtime); this
//! module takes the fetched days so the whole decision path runs without a
//! network.

use crate::config::{Config, ConfigError};
use crate::evaluator::{self, Evaluation, EvaluationError};
use crate::forecast::FetchError;
use crate::notifier::{Notifier, NotifyError};
use crate::report::Report;
use crate::ForecastDay;
use chrono::NaiveDate;
use std::process::ExitCode;
use thiserror::Error;

/// Anything that ends a run early.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// The async runtime could not be built
    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),
}

impl RunError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(match self {
            RunError::Fetch(_) => 1,
            RunError::Evaluation(_) => 2,
            RunError::Notify(_) => 3,
            RunError::Config(_) => 4,
            RunError::Runtime(_) => 5,
        })
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub evaluation: Evaluation,
    /// The rendered report
    pub message: String,
    /// Whether the notifier was invoked
    pub delivered: bool,
    /// Whether the report was printed to stdout by the pipeline itself
    pub echoed: bool,
}

/// Evaluate the target day and deliver the report.
///
/// The notifier is invoked once for an alert. A "no surf" report is delivered
/// only when `notify_on_no_alert` is set. The report always ends up on
/// stdout: it is echoed there unless the notifier that delivered it already
/// writes to stdout. An evaluation error returns before the notifier is
/// touched.
pub fn process(
    days: &[ForecastDay],
    target_date: NaiveDate,
    config: &Config,
    notifier: &dyn Notifier,
) -> Result<Outcome, RunError> {
    let evaluation = evaluator::evaluate(days, target_date, config.alert.threshold_m)?;

    let report = Report::from_config(config);
    let message = report.format(&evaluation);

    let delivered = match &evaluation {
        Evaluation::Alert(result) => {
            log::info!(
                "🏄 {} qualifying hour(s) on {}, max {:.1}m",
                result.qualifying.len(),
                result.date,
                result.max_wave_height
            );
            true
        }
        Evaluation::NoAlert(none) => {
            log::info!(
                "No hour reaches {:.1}m on {} (max {:.1}m)",
                config.alert.threshold_m,
                none.date,
                none.max_wave_height
            );
            config.alert.notify_on_no_alert
        }
    };

    if delivered {
        let subject = report.subject(&evaluation);
        log::info!("📤 Delivering report via {}", notifier.name());
        notifier.notify(&subject, &message)?;
    }

    let echoed = !(delivered && notifier.writes_to_stdout());
    if echoed {
        println!("{}", message);
    }

    Ok(Outcome {
        evaluation,
        message,
        delivered,
        echoed,
    })
}
