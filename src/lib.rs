//! # Surf Alert Core Library
//!
//! This library provides the data structures and pipeline stages for the surf
//! alert application. One run fetches tomorrow's marine forecast for a fixed
//! coastal spot, checks every hour against a wave-height threshold, and sends a
//! single plain-text summary when the surf is on.
//!
//! ## Data Flow
//! 1. **Fetch**: [`forecast`] pulls hourly wave and wind arrays from Open-Meteo
//! 2. **Evaluate**: [`evaluator`] keeps the hours of the target day that clear the threshold
//! 3. **Format**: [`report`] renders the outcome as console/email text
//! 4. **Notify**: [`notifier`] delivers it once, to stdout or over SMTP
//!
//! Every run is stateless: nothing is cached and nothing outlives the process.
//!
//! ## Core Types
//! - [`HourlyReading`]: one forecasted hour at the configured location
//! - [`ForecastDay`]: all readings for one local calendar date

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod config;
pub mod evaluator;
pub mod forecast;
pub mod notifier;
pub mod pipeline;
pub mod quality;
pub mod report;

/// One forecasted hour.
///
/// `time` is location-local (the provider is asked for the spot's time zone),
/// so the date part can be compared directly with the target date.
///
/// Wave height is always present: hours the provider reports as `null` are
/// dropped at fetch time. The secondary values stay optional because the wind
/// request is best-effort and the provider occasionally leaves gaps.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use surf_alert_lib::HourlyReading;
///
/// let time = NaiveDate::from_ymd_opt(2025, 3, 8)
///     .unwrap()
///     .and_hms_opt(7, 0, 0)
///     .unwrap();
/// let reading = HourlyReading::new(time, 1.4);
/// assert_eq!(reading.wave_height_m, 1.4);
/// assert!(reading.wind_speed_kmh.is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourlyReading {
    /// Local timestamp of the hour
    pub time: NaiveDateTime,
    /// Significant wave height in metres
    pub wave_height_m: f64,
    /// Direction the waves come from, degrees
    pub wave_direction_deg: Option<f64>,
    /// Wave period in seconds
    pub wave_period_s: Option<f64>,
    /// Wind speed at 10 m in km/h
    pub wind_speed_kmh: Option<f64>,
    /// Direction the wind comes from, degrees
    pub wind_direction_deg: Option<f64>,
}

impl HourlyReading {
    /// Reading with only a wave height; secondary values unset.
    pub fn new(time: NaiveDateTime, wave_height_m: f64) -> Self {
        HourlyReading {
            time,
            wave_height_m,
            wave_direction_deg: None,
            wave_period_s: None,
            wind_speed_kmh: None,
            wind_direction_deg: None,
        }
    }
}

/// All readings for one local calendar date, ascending by time.
///
/// Produced wholesale by [`forecast::group_by_day`] and never mutated afterwards.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use surf_alert_lib::{ForecastDay, HourlyReading};
///
/// let date = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
/// let day = ForecastDay {
///     date,
///     readings: vec![HourlyReading::new(date.and_hms_opt(0, 0, 0).unwrap(), 0.9)],
/// };
/// assert_eq!(day.readings.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub readings: Vec<HourlyReading>,
}
