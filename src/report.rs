//! # Surf Report Rendering
//!
//! Turns an [`Evaluation`] into plain text that works verbatim as console
//! output or as an email body. No HTML, no markup.
//!
//! Heights, periods and speeds are shown with one decimal. Bearings are shown
//! both in degrees and as a 16-point compass abbreviation (see [`compass`]).
//! Values the provider did not supply render as `N/A`.

use crate::config::Config;
use crate::evaluator::{AlertResult, Evaluation, NoAlert};
use crate::quality::{self, SpotProfile};
use crate::HourlyReading;
use std::fmt::Write;

/// 16-point compass, clockwise from north
const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Convert a bearing in degrees to its 16-point compass abbreviation.
///
/// Each point owns a 22.5° sector centred on it, so 11.25° is already NNE.
/// Any finite input is accepted; values wrap around 360°.
///
/// # Example
/// ```
/// use surf_alert_lib::report::compass;
///
/// assert_eq!(compass(0.0), "N");
/// assert_eq!(compass(112.0), "ESE");
/// assert_eq!(compass(-90.0), "W");
/// ```
pub fn compass(degrees: f64) -> &'static str {
    let index = (degrees.rem_euclid(360.0) / 22.5).round() as usize % 16;
    COMPASS_POINTS[index]
}

/// Renders evaluations for one location.
#[derive(Debug, Clone)]
pub struct Report<'a> {
    location: &'a str,
    threshold_m: f64,
    /// Quality annotations are shown only when a spot profile is set
    spot: Option<&'a SpotProfile>,
}

impl<'a> Report<'a> {
    pub fn new(location: &'a str, threshold_m: f64) -> Self {
        Report {
            location,
            threshold_m,
            spot: None,
        }
    }

    /// Annotate qualifying hours with a quality score for this spot.
    pub fn with_quality(mut self, spot: &'a SpotProfile) -> Self {
        self.spot = Some(spot);
        self
    }

    pub fn from_config(config: &'a Config) -> Self {
        let report = Report::new(&config.location.name, config.alert.threshold_m);
        if config.alert.show_quality {
            report.with_quality(&config.spot)
        } else {
            report
        }
    }

    /// Full message body.
    pub fn format(&self, evaluation: &Evaluation) -> String {
        match evaluation {
            Evaluation::Alert(result) => self.format_alert(result),
            Evaluation::NoAlert(none) => self.format_no_alert(none),
        }
    }

    /// One-line summary for an email subject.
    pub fn subject(&self, evaluation: &Evaluation) -> String {
        match evaluation {
            Evaluation::Alert(result) => format!(
                "🏄 Surf Alert {}: up to {:.1}m at {}",
                result.date, result.max_wave_height, self.location
            ),
            Evaluation::NoAlert(none) => format!(
                "Surf report {}: flat at {} (max {:.1}m)",
                none.date, self.location, none.max_wave_height
            ),
        }
    }

    fn format_alert(&self, result: &AlertResult) -> String {
        let mut out = String::new();

        // Writing to a String cannot fail
        let _ = writeln!(out, "🏄 SURF ALERT for {} 🏄", result.date);
        let _ = writeln!(out, "Location: {}", self.location);
        let _ = writeln!(out);
        let _ = writeln!(out, "Maximum Wave Height: {:.1}m", result.max_wave_height);

        if let Some(spot) = self.spot {
            let peak = result
                .qualifying
                .iter()
                .map(|r| quality::score(r, spot))
                .fold(0.0, f64::max);
            let _ = writeln!(
                out,
                "Peak Quality Score: {:.0}/100 {}",
                peak,
                quality::rating(peak)
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Good surfing conditions (≥ {:.1}m) at these times:",
            self.threshold_m
        );

        for reading in &result.qualifying {
            let _ = writeln!(out);
            self.write_hour(&mut out, reading);
        }
        out
    }

    fn write_hour(&self, out: &mut String, reading: &HourlyReading) {
        let time = reading.time.format("%H:%M");
        match self.spot {
            Some(spot) => {
                let score = quality::score(reading, spot);
                let _ = writeln!(
                    out,
                    "⏰ {} - Quality: {:.0}/100 {}",
                    time,
                    score,
                    quality::rating(score)
                );
            }
            None => {
                let _ = writeln!(out, "⏰ {}", time);
            }
        }
        let _ = writeln!(
            out,
            "   Wave: {:.1}m from {}, period {}",
            reading.wave_height_m,
            bearing(reading.wave_direction_deg),
            with_unit(reading.wave_period_s, "s"),
        );
        let _ = writeln!(
            out,
            "   Wind: {} from {}",
            with_unit(reading.wind_speed_kmh, " km/h"),
            bearing(reading.wind_direction_deg),
        );
    }

    fn format_no_alert(&self, none: &NoAlert) -> String {
        format!(
            "No surf alert for {} at {}.\n\
             Maximum wave height {:.1}m stays below the {:.1}m threshold.\n",
            none.date, self.location, none.max_wave_height, self.threshold_m
        )
    }
}

fn bearing(degrees: Option<f64>) -> String {
    match degrees {
        Some(d) => format!("{:.0}° ({})", d, compass(d)),
        None => "N/A".to_string(),
    }
}

fn with_unit(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "N/A".to_string(),
    }
}
