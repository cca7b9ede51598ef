//! Alert decision for one target day.
//!
//! [`evaluate`] is a pure function of its inputs: same days, same date, same
//! threshold, same answer. "No surf" is a normal [`Evaluation::NoAlert`], not
//! an error; only a missing or empty target day is an [`EvaluationError`].

use crate::{ForecastDay, HourlyReading};
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// The forecast cannot answer the question for the target date.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The provider returned no day matching the target date
    #[error("forecast has no data for {target} (days available: {available})")]
    MissingDate { target: NaiveDate, available: String },

    /// The target day exists but holds no readings
    #[error("forecast for {0} contains no hourly readings")]
    EmptyDay(NaiveDate),
}

/// At least one hour clears the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertResult {
    pub date: NaiveDate,
    /// Maximum over every hour of the day, not just the qualifying ones
    pub max_wave_height: f64,
    /// Readings with `wave_height_m >= threshold`, ascending by time
    pub qualifying: Vec<HourlyReading>,
}

/// No hour clears the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct NoAlert {
    pub date: NaiveDate,
    pub max_wave_height: f64,
}

/// Outcome of evaluating one day.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Alert(AlertResult),
    NoAlert(NoAlert),
}

impl Evaluation {
    pub fn date(&self) -> NaiveDate {
        match self {
            Evaluation::Alert(result) => result.date,
            Evaluation::NoAlert(none) => none.date,
        }
    }

    pub fn max_wave_height(&self) -> f64 {
        match self {
            Evaluation::Alert(result) => result.max_wave_height,
            Evaluation::NoAlert(none) => none.max_wave_height,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Evaluation::Alert(_))
    }
}

/// Check the target day of a forecast against a wave-height threshold.
pub fn evaluate(
    days: &[ForecastDay],
    target_date: NaiveDate,
    threshold_m: f64,
) -> Result<Evaluation, EvaluationError> {
    let day = days
        .iter()
        .find(|day| day.date == target_date)
        .ok_or_else(|| EvaluationError::MissingDate {
            target: target_date,
            available: available_dates(days),
        })?;

    let max_wave_height = day
        .readings
        .iter()
        .map(|r| r.wave_height_m)
        .reduce(f64::max)
        .ok_or(EvaluationError::EmptyDay(target_date))?;

    let qualifying: Vec<HourlyReading> = day
        .readings
        .iter()
        .filter(|r| r.wave_height_m >= threshold_m)
        .copied()
        .collect();

    if qualifying.is_empty() {
        Ok(Evaluation::NoAlert(NoAlert {
            date: target_date,
            max_wave_height,
        }))
    } else {
        Ok(Evaluation::Alert(AlertResult {
            date: target_date,
            max_wave_height,
            qualifying,
        }))
    }
}

/// Tomorrow's date as seen on the wall clock at the forecast location.
///
/// A runner scheduled in UTC near midnight would otherwise pick a different
/// "tomorrow" than the spot it is forecasting for.
pub fn target_date(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    let today = now.with_timezone(&tz).date_naive();
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

fn available_dates(days: &[ForecastDay]) -> String {
    if days.is_empty() {
        return "none".to_string();
    }
    days.iter()
        .map(|d| d.date.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
