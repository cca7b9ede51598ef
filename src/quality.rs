//! # Surf Quality Scoring
//!
//! A rough 0-100 "is it worth paddling out" score for a single hour, tuned for
//! the short-period wind swell of the Mediterranean (3-6 s is normal there).
//!
//! The score only annotates the report. Which hours qualify is decided by the
//! wave-height threshold alone, see [`crate::evaluator`].
//!
//! ## Weights
//! - **Wave height**: 35% (nothing else matters if it is flat)
//! - **Wave period**: 25%
//! - **Swell direction**: 20%
//! - **Wind direction**: 15% (offshore is clean, onshore is chop)
//! - **Wind speed**: 5%

use crate::HourlyReading;
use serde::{Deserialize, Serialize};

/// Spot geometry: how each swell and wind direction scores at the beach.
///
/// Angles are compass bearings the swell or wind comes *from*. Arcs are
/// checked in order and the first one containing the bearing sets the score;
/// a bearing outside every arc gets the fallback.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpotProfile {
    pub swell: Vec<ScoredArc>,
    pub swell_fallback: f64,
    pub wind: Vec<ScoredArc>,
    pub wind_fallback: f64,
}

/// Open arc of compass bearings with the score it earns.
///
/// Both edges are excluded. An arc may wrap through north
/// (e.g. `from_deg = 330, to_deg = 30`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScoredArc {
    pub from_deg: f64,
    pub to_deg: f64,
    pub score: f64,
}

impl ScoredArc {
    pub const fn new(from_deg: f64, to_deg: f64, score: f64) -> Self {
        ScoredArc {
            from_deg,
            to_deg,
            score,
        }
    }

    /// Whether `deg` lies strictly between the two edges.
    pub fn contains(&self, deg: f64) -> bool {
        let span = (self.to_deg - self.from_deg).rem_euclid(360.0);
        let span = if span == 0.0 && self.to_deg != self.from_deg {
            360.0
        } else {
            span
        };
        let offset = (deg - self.from_deg).rem_euclid(360.0);
        offset > 0.0 && offset < span
    }
}

impl Default for SpotProfile {
    // Vilassar de Mar: best swell E to ESE, offshore W to NW
    fn default() -> Self {
        SpotProfile {
            swell: vec![
                ScoredArc::new(85.0, 135.0, 100.0),
                ScoredArc::new(70.0, 150.0, 85.0),
                ScoredArc::new(50.0, 170.0, 65.0),
                ScoredArc::new(30.0, 180.0, 40.0),
            ],
            swell_fallback: 20.0,
            wind: vec![
                // Offshore
                ScoredArc::new(240.0, 360.0, 100.0),
                // Side-offshore
                ScoredArc::new(330.0, 30.0, 80.0),
                // Cross-shore
                ScoredArc::new(30.0, 80.0, 60.0),
                ScoredArc::new(180.0, 240.0, 60.0),
                // Onshore
                ScoredArc::new(80.0, 150.0, 30.0),
            ],
            wind_fallback: 50.0,
        }
    }
}

fn score_direction(direction: Option<f64>, arcs: &[ScoredArc], fallback: f64) -> f64 {
    let Some(direction) = direction else {
        return 50.0;
    };
    arcs.iter()
        .find(|arc| arc.contains(direction))
        .map_or(fallback, |arc| arc.score)
}

/// Score one hour, 0-100 rounded to one decimal.
pub fn score(reading: &HourlyReading, spot: &SpotProfile) -> f64 {
    let height = reading.wave_height_m;
    let height_score = score_wave_height(height);

    // Too small to ride: nothing else matters
    if height_score < 30.0 {
        return height_score;
    }

    let period_score = score_wave_period(reading.wave_period_s);
    let swell_score = score_swell_direction(reading.wave_direction_deg, spot);
    let wind_dir_score = score_wind_direction(reading.wind_direction_deg, spot);
    let wind_speed_score = score_wind_speed(reading.wind_speed_kmh);

    let mut quality = height_score * 0.35
        + period_score * 0.25
        + swell_score * 0.20
        + wind_dir_score * 0.15
        + wind_speed_score * 0.05;

    // Long period plus size means power
    if let Some(period) = reading.wave_period_s {
        if period >= 6.0 && height >= 0.8 {
            quality *= 1.15;
        } else if period >= 5.0 && height >= 1.0 {
            quality *= 1.08;
        }
    }

    // Size straight into the beach
    if height >= 0.8 && swell_score >= 100.0 {
        quality *= 1.05;
    }

    ((quality * 10.0).round() / 10.0).min(100.0)
}

/// Star rating for a score.
pub fn rating(score: f64) -> &'static str {
    if score >= 80.0 {
        "⭐⭐⭐⭐⭐ EPIC"
    } else if score >= 70.0 {
        "⭐⭐⭐⭐ EXCELLENT"
    } else if score >= 60.0 {
        "⭐⭐⭐ GOOD"
    } else if score >= 50.0 {
        "⭐⭐ FAIR"
    } else if score >= 40.0 {
        "⚠️ MARGINAL"
    } else {
        "❌ POOR"
    }
}

fn score_wave_height(height: f64) -> f64 {
    match height {
        h if h < 0.2 => 0.0,
        h if h < 0.4 => 30.0,
        h if h < 0.6 => 60.0,
        h if h < 0.9 => 80.0,
        h if h < 1.2 => 90.0,
        h if h < 1.8 => 95.0,
        h if h < 2.5 => 90.0,
        // Too big for most
        _ => 70.0,
    }
}

fn score_wave_period(period: Option<f64>) -> f64 {
    let Some(period) = period else {
        return 40.0;
    };
    match period {
        p if p < 3.0 => 20.0,
        p if p < 4.0 => 50.0,
        p if p < 5.0 => 65.0,
        p if p < 6.0 => 75.0,
        p if p < 7.0 => 85.0,
        p if p < 9.0 => 90.0,
        // Groundswell, rare in the Med
        _ => 95.0,
    }
}

fn score_swell_direction(direction: Option<f64>, spot: &SpotProfile) -> f64 {
    score_direction(direction, &spot.swell, spot.swell_fallback)
}

fn score_wind_direction(direction: Option<f64>, spot: &SpotProfile) -> f64 {
    score_direction(direction, &spot.wind, spot.wind_fallback)
}

fn score_wind_speed(speed: Option<f64>) -> f64 {
    let Some(speed) = speed else {
        return 50.0;
    };
    match speed {
        s if s < 5.0 => 95.0,
        s if s < 10.0 => 90.0,
        s if s < 15.0 => 75.0,
        s if s < 20.0 => 60.0,
        s if s < 25.0 => 40.0,
        _ => 20.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reading(height: f64) -> HourlyReading {
        let time = NaiveDate::from_ymd_opt(2025, 3, 8)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        HourlyReading::new(time, height)
    }

    #[test]
    fn test_flat_sea_scores_height_only() {
        let spot = SpotProfile::default();
        let mut r = reading(0.1);
        r.wave_period_s = Some(8.0);
        r.wind_speed_kmh = Some(2.0);
        assert_eq!(score(&r, &spot), 0.0);
    }

    #[test]
    fn test_clean_ese_swell_is_epic() {
        let spot = SpotProfile::default();
        let mut r = reading(1.0);
        r.wave_direction_deg = Some(110.0);
        r.wave_period_s = Some(6.5);
        r.wind_direction_deg = Some(300.0);
        r.wind_speed_kmh = Some(4.0);

        let s = score(&r, &spot);
        assert!(s >= 80.0, "expected epic score, got {s}");
        assert!(s <= 100.0);
        assert_eq!(rating(s), "⭐⭐⭐⭐⭐ EPIC");
    }

    #[test]
    fn test_onshore_wind_costs_points() {
        let spot = SpotProfile::default();
        let mut offshore = reading(0.7);
        offshore.wave_direction_deg = Some(100.0);
        offshore.wave_period_s = Some(4.5);
        offshore.wind_direction_deg = Some(300.0);
        offshore.wind_speed_kmh = Some(12.0);

        let mut onshore = offshore;
        onshore.wind_direction_deg = Some(110.0);

        assert!(score(&onshore, &spot) < score(&offshore, &spot));
    }

    #[test]
    fn test_unknown_values_use_neutral_scores() {
        let spot = SpotProfile::default();
        // 0.35*80 + 0.25*40 + 0.20*50 + 0.15*50 + 0.05*50
        assert_eq!(score(&reading(0.7), &spot), 58.0);
    }

    #[test]
    fn test_arc_wraps_through_north() {
        let arc = ScoredArc::new(330.0, 30.0, 80.0);
        assert!(arc.contains(0.0));
        assert!(arc.contains(350.0));
        assert!(arc.contains(360.0));
        assert!(arc.contains(-10.0));
        assert!(!arc.contains(40.0));
        assert!(!arc.contains(180.0));
    }

    #[test]
    fn test_arc_edges_are_excluded() {
        let arc = ScoredArc::new(85.0, 135.0, 100.0);
        assert!(!arc.contains(85.0));
        assert!(!arc.contains(135.0));
        assert!(arc.contains(85.5));
        assert!(arc.contains(134.9));
    }

    #[test]
    fn test_default_swell_bands() {
        let spot = SpotProfile::default();
        let swell = |d: f64| score_swell_direction(Some(d), &spot);
        assert_eq!(swell(110.0), 100.0);
        // Window edges fall to the next band
        assert_eq!(swell(85.0), 85.0);
        assert_eq!(swell(135.0), 85.0);
        assert_eq!(swell(160.0), 65.0);
        assert_eq!(swell(175.0), 40.0);
        assert_eq!(swell(185.0), 20.0);
        assert_eq!(swell(300.0), 20.0);
        assert_eq!(score_swell_direction(None, &spot), 50.0);
    }

    #[test]
    fn test_default_wind_bands() {
        let spot = SpotProfile::default();
        let wind = |d: f64| score_wind_direction(Some(d), &spot);
        assert_eq!(wind(300.0), 100.0);
        assert_eq!(wind(245.0), 100.0);
        assert_eq!(wind(10.0), 80.0);
        assert_eq!(wind(360.0), 80.0);
        // WSW is cross-shore, not side-offshore
        assert_eq!(wind(225.0), 60.0);
        assert_eq!(wind(50.0), 60.0);
        assert_eq!(wind(110.0), 30.0);
        // Between the named bands
        assert_eq!(wind(155.0), 50.0);
        assert_eq!(wind(240.0), 50.0);
    }

    #[test]
    fn test_edge_swell_gets_no_direction_bonus() {
        let spot = SpotProfile::default();
        let mut inside = reading(1.0);
        inside.wave_direction_deg = Some(100.0);
        let mut edge = inside;
        edge.wave_direction_deg = Some(135.0);

        // 0.35*90 + 0.25*40 + 0.20*100 + 0.15*50 + 0.05*50 = 71.5, then x1.05
        assert_eq!(score(&inside, &spot), 75.1);
        // Same with 85 for the swell and no bonus
        assert_eq!(score(&edge, &spot), 68.5);
    }

    #[test]
    fn test_ratings() {
        assert_eq!(rating(72.0), "⭐⭐⭐⭐ EXCELLENT");
        assert_eq!(rating(50.0), "⭐⭐ FAIR");
        assert_eq!(rating(12.0), "❌ POOR");
    }
}
