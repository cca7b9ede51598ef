//! # Open-Meteo Forecast Fetching
//!
//! This module handles all network operations for the surf alert. It pulls
//! hourly marine data (wave height, direction and period) and hourly wind data
//! from Open-Meteo, a free API that needs no key.
//!
//! ## Data Sources
//!
//! ### Marine API (required)
//! - **URL**: https://marine-api.open-meteo.com/v1/marine
//! - **Variables**: `wave_height`, `wave_direction`, `wave_period`
//!
//! ### Weather API (best-effort)
//! - **URL**: https://api.open-meteo.com/v1/forecast
//! - **Variables**: `wind_speed_10m`, `wind_direction_10m`
//!
//! The marine API has no wind, so a second request fills it in. A failed wind
//! request only costs the wind columns of the report; a failed marine request
//! aborts the run.
//!
//! ## Payload
//! Both endpoints answer with parallel arrays, one entry per hour:
//! ```json
//! { "hourly": { "time": ["2025-03-08T00:00", ...], "wave_height": [0.82, ...] } }
//! ```
//! Timestamps are local to the `timezone` query parameter.
//!
//! ## Error Handling
//! Every failure maps to one [`FetchError`] variant so the caller can tell an
//! unreachable host from a bad status from a payload it cannot read.

use crate::config::ApiConfig;
use crate::{ForecastDay, HourlyReading};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Hourly marine variables requested from the provider
const MARINE_VARIABLES: &str = "wave_height,wave_direction,wave_period";

/// Hourly wind variables requested from the provider
const WIND_VARIABLES: &str = "wind_speed_10m,wind_direction_10m";

/// Errors that can occur while fetching the forecast.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Host unreachable, connection reset, or timeout
    #[error("forecast provider unreachable: {0}")]
    Network(#[source] reqwest::Error),

    /// Provider answered with a non-2xx status
    #[error("forecast provider returned HTTP {0}")]
    Status(u16),

    /// Body was not the JSON shape we expect
    #[error("malformed forecast payload: {0}")]
    Malformed(String),

    /// Request parameters were rejected before anything was sent
    #[error("invalid forecast request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Deserialize)]
struct MarineResponse {
    hourly: Option<MarineHourly>,
}

#[derive(Debug, Deserialize)]
struct MarineHourly {
    time: Vec<String>,
    wave_height: Vec<Option<f64>>,
    #[serde(default)]
    wave_direction: Vec<Option<f64>>,
    #[serde(default)]
    wave_period: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct WindResponse {
    hourly: Option<WindHourly>,
}

#[derive(Debug, Deserialize)]
struct WindHourly {
    time: Vec<String>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
}

/// Wind speed and direction keyed by local hour
pub type WindTable = HashMap<NaiveDateTime, (Option<f64>, Option<f64>)>;

/// HTTP client for the two Open-Meteo endpoints.
pub struct ForecastClient {
    http: reqwest::Client,
    marine_url: String,
    weather_url: String,
}

impl ForecastClient {
    /// Build a client with the configured endpoints and a fixed request timeout.
    pub fn new(api: &ApiConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        Ok(ForecastClient {
            http,
            marine_url: api.marine_url.clone(),
            weather_url: api.weather_url.clone(),
        })
    }

    /// Fetch `forecast_days` days of hourly readings for a location.
    ///
    /// Returns one [`ForecastDay`] per local date in the response, ascending.
    /// `timezone` is an IANA zone name; the provider returns timestamps in it.
    pub async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        forecast_days: u8,
        timezone: &str,
    ) -> Result<Vec<ForecastDay>, FetchError> {
        if forecast_days == 0 {
            return Err(FetchError::InvalidRequest(
                "forecast_days must be at least 1".to_string(),
            ));
        }

        let marine = self
            .get_body(
                &self.marine_url,
                latitude,
                longitude,
                MARINE_VARIABLES,
                forecast_days,
                timezone,
            )
            .await?;
        let mut readings = parse_marine(&marine)?;
        log::debug!("Marine forecast: {} hourly readings", readings.len());

        // Wind is optional - the report shows N/A without it
        let wind = match self
            .get_body(
                &self.weather_url,
                latitude,
                longitude,
                WIND_VARIABLES,
                forecast_days,
                timezone,
            )
            .await
            .and_then(|body| parse_wind(&body))
        {
            Ok(table) => Some(table),
            Err(e) => {
                log::warn!("Wind forecast unavailable, continuing without it: {}", e);
                None
            }
        };
        if let Some(table) = wind {
            merge_wind(&mut readings, &table);
        }

        Ok(group_by_day(readings))
    }

    async fn get_body(
        &self,
        url: &str,
        latitude: f64,
        longitude: f64,
        hourly: &str,
        forecast_days: u8,
        timezone: &str,
    ) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", hourly.to_string()),
                ("forecast_days", forecast_days.to_string()),
                ("timezone", timezone.to_string()),
            ])
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(FetchError::Network)
    }
}

/// Parse a marine response body into readings, in payload order.
///
/// Hours whose wave height is `null` are skipped. Secondary arrays may be
/// absent (all `None`) but must otherwise match the length of `time`.
pub fn parse_marine(body: &str) -> Result<Vec<HourlyReading>, FetchError> {
    let response: MarineResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let hourly = response
        .hourly
        .ok_or_else(|| FetchError::Malformed("missing `hourly` section".to_string()))?;

    let n = hourly.time.len();
    check_len("wave_height", hourly.wave_height.len(), n, false)?;
    check_len("wave_direction", hourly.wave_direction.len(), n, true)?;
    check_len("wave_period", hourly.wave_period.len(), n, true)?;

    let mut readings = Vec::with_capacity(n);
    for (i, raw_time) in hourly.time.iter().enumerate() {
        let time = parse_time(raw_time)?;
        let Some(wave_height_m) = hourly.wave_height[i] else {
            log::debug!("No wave height for {}, skipping hour", raw_time);
            continue;
        };
        readings.push(HourlyReading {
            time,
            wave_height_m,
            wave_direction_deg: hourly.wave_direction.get(i).copied().flatten(),
            wave_period_s: hourly.wave_period.get(i).copied().flatten(),
            wind_speed_kmh: None,
            wind_direction_deg: None,
        });
    }
    Ok(readings)
}

/// Parse a weather response body into a wind lookup table.
pub fn parse_wind(body: &str) -> Result<WindTable, FetchError> {
    let response: WindResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let hourly = response
        .hourly
        .ok_or_else(|| FetchError::Malformed("missing `hourly` section".to_string()))?;

    let n = hourly.time.len();
    check_len("wind_speed_10m", hourly.wind_speed_10m.len(), n, true)?;
    check_len("wind_direction_10m", hourly.wind_direction_10m.len(), n, true)?;

    let mut table = WindTable::with_capacity(n);
    for (i, raw_time) in hourly.time.iter().enumerate() {
        let time = parse_time(raw_time)?;
        let speed = hourly.wind_speed_10m.get(i).copied().flatten();
        let direction = hourly.wind_direction_10m.get(i).copied().flatten();
        table.insert(time, (speed, direction));
    }
    Ok(table)
}

/// Copy wind values onto the readings with the same timestamp.
pub fn merge_wind(readings: &mut [HourlyReading], wind: &WindTable) {
    for reading in readings.iter_mut() {
        if let Some(&(speed, direction)) = wind.get(&reading.time) {
            reading.wind_speed_kmh = speed;
            reading.wind_direction_deg = direction;
        }
    }
}

/// Sort readings by time and split them into one [`ForecastDay`] per date.
///
/// A local hour can appear twice when clocks fall back. Only one reading per
/// timestamp is kept, the one with the larger wave height, so the day's
/// maximum survives.
pub fn group_by_day(mut readings: Vec<HourlyReading>) -> Vec<ForecastDay> {
    readings.sort_by_key(|r| r.time);

    let mut days: Vec<ForecastDay> = Vec::new();
    for reading in readings {
        let date = reading.time.date();
        match days.last_mut() {
            Some(day) if day.date == date => match day.readings.last_mut() {
                Some(prev) if prev.time == reading.time => {
                    log::debug!(
                        "Repeated hour {} ({:.2}m vs {:.2}m), keeping the larger",
                        reading.time,
                        prev.wave_height_m,
                        reading.wave_height_m
                    );
                    if reading.wave_height_m > prev.wave_height_m {
                        *prev = reading;
                    }
                }
                _ => day.readings.push(reading),
            },
            _ => days.push(ForecastDay {
                date,
                readings: vec![reading],
            }),
        }
    }
    days
}

fn parse_time(raw: &str) -> Result<NaiveDateTime, FetchError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| FetchError::Malformed(format!("bad timestamp {raw:?}")))
}

// Optional arrays may be missing entirely (len 0)
fn check_len(name: &str, len: usize, expected: usize, optional: bool) -> Result<(), FetchError> {
    if len == expected || (optional && len == 0) {
        Ok(())
    } else {
        Err(FetchError::Malformed(format!(
            "`{name}` has {len} entries, expected {expected}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const MARINE_BODY: &str = r#"{
        "latitude": 41.5,
        "longitude": 2.375,
        "timezone": "Europe/Madrid",
        "hourly": {
            "time": ["2025-03-08T23:00", "2025-03-09T00:00", "2025-03-09T01:00"],
            "wave_height": [0.62, 0.74, null],
            "wave_direction": [101.0, null, 98.0],
            "wave_period": [4.8, 5.1, 5.0]
        }
    }"#;

    const WIND_BODY: &str = r#"{
        "hourly": {
            "time": ["2025-03-08T23:00", "2025-03-09T00:00", "2025-03-09T01:00"],
            "wind_speed_10m": [12.4, 9.8, 7.1],
            "wind_direction_10m": [310.0, 295.0, null]
        }
    }"#;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_marine_skips_null_wave_heights() {
        let readings = parse_marine(MARINE_BODY).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].time, at(8, 23));
        assert_eq!(readings[0].wave_height_m, 0.62);
        assert_eq!(readings[0].wave_direction_deg, Some(101.0));
        assert_eq!(readings[1].wave_direction_deg, None);
        assert_eq!(readings[1].wave_period_s, Some(5.1));
    }

    #[test]
    fn test_parse_marine_without_optional_arrays() {
        let body = r#"{"hourly": {"time": ["2025-03-09T06:00"], "wave_height": [1.1]}}"#;
        let readings = parse_marine(body).unwrap();
        assert_eq!(readings.len(), 1);
        assert!(readings[0].wave_period_s.is_none());
    }

    #[test]
    fn test_parse_marine_rejects_bad_payloads() {
        let missing_hourly = r#"{"latitude": 41.5}"#;
        assert!(matches!(
            parse_marine(missing_hourly),
            Err(FetchError::Malformed(_))
        ));

        let short_array = r#"{"hourly": {"time": ["2025-03-09T06:00", "2025-03-09T07:00"], "wave_height": [1.1]}}"#;
        assert!(matches!(
            parse_marine(short_array),
            Err(FetchError::Malformed(_))
        ));

        let bad_time = r#"{"hourly": {"time": ["yesterday"], "wave_height": [1.1]}}"#;
        assert!(matches!(parse_marine(bad_time), Err(FetchError::Malformed(_))));

        assert!(matches!(
            parse_marine("<html>502</html>"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_merge_wind_by_timestamp() {
        let mut readings = parse_marine(MARINE_BODY).unwrap();
        let wind = parse_wind(WIND_BODY).unwrap();
        merge_wind(&mut readings, &wind);

        assert_eq!(readings[0].wind_speed_kmh, Some(12.4));
        assert_eq!(readings[0].wind_direction_deg, Some(310.0));
        assert_eq!(readings[1].wind_speed_kmh, Some(9.8));
        assert_eq!(readings[1].wind_direction_deg, Some(295.0));
    }

    #[test]
    fn test_group_by_day_sorts_and_splits() {
        let readings = vec![
            HourlyReading::new(at(9, 1), 0.9),
            HourlyReading::new(at(8, 23), 0.5),
            HourlyReading::new(at(9, 0), 0.8),
        ];
        let days = group_by_day(readings);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 3, 8).unwrap());
        assert_eq!(days[0].readings.len(), 1);
        assert_eq!(days[1].readings[0].time, at(9, 0));
        assert_eq!(days[1].readings[1].time, at(9, 1));
    }

    #[test]
    fn test_group_by_day_empty() {
        assert!(group_by_day(Vec::new()).is_empty());
    }

    #[test]
    fn test_repeated_hour_keeps_larger_wave() {
        // Fall-back night: 02:00 local appears twice
        let readings = vec![
            HourlyReading::new(at(9, 1), 0.6),
            HourlyReading::new(at(9, 2), 0.8),
            HourlyReading::new(at(9, 2), 1.4),
            HourlyReading::new(at(9, 3), 0.7),
        ];
        let days = group_by_day(readings);

        assert_eq!(days.len(), 1);
        let hours: Vec<(NaiveDateTime, f64)> = days[0]
            .readings
            .iter()
            .map(|r| (r.time, r.wave_height_m))
            .collect();
        assert_eq!(hours, vec![(at(9, 1), 0.6), (at(9, 2), 1.4), (at(9, 3), 0.7)]);

        // Order in the payload does not matter
        let days = group_by_day(vec![
            HourlyReading::new(at(9, 2), 1.4),
            HourlyReading::new(at(9, 2), 0.8),
        ]);
        assert_eq!(days[0].readings.len(), 1);
        assert_eq!(days[0].readings[0].wave_height_m, 1.4);
    }

    /// Canned reply for one endpoint of the stub server
    struct Canned {
        status: &'static str,
        body: &'static str,
    }

    const OK: &str = "200 OK";

    /// Serve `marine` for `/v1/marine` and `weather` for everything else.
    ///
    /// Returns the `ApiConfig` pointing at the stub. One connection per
    /// request, closed after the reply.
    async fn stub_server(marine: Canned, weather: Canned) -> ApiConfig {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut request: Vec<u8> = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n".as_slice()) {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let request_line = head.lines().next().unwrap_or_default();
                let reply = if request_line.contains("/v1/marine") {
                    &marine
                } else {
                    &weather
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    reply.status,
                    reply.body.len(),
                    reply.body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        ApiConfig {
            marine_url: format!("http://{addr}/v1/marine"),
            weather_url: format!("http://{addr}/v1/forecast"),
            timeout_secs: 5,
        }
    }

    async fn fetch_from(api: &ApiConfig) -> Result<Vec<ForecastDay>, FetchError> {
        ForecastClient::new(api)
            .unwrap()
            .fetch_forecast(41.5089, 2.3944, 3, "Europe/Madrid")
            .await
    }

    #[tokio::test]
    async fn test_marine_error_status_is_status_error() {
        let api = stub_server(
            Canned {
                status: "503 Service Unavailable",
                body: r#"{"error": true, "reason": "overloaded"}"#,
            },
            Canned {
                status: OK,
                body: WIND_BODY,
            },
        )
        .await;

        let result = fetch_from(&api).await;
        assert!(matches!(result, Err(FetchError::Status(503))), "{result:?}");
    }

    #[tokio::test]
    async fn test_wind_failure_is_not_fatal() {
        let api = stub_server(
            Canned {
                status: OK,
                body: MARINE_BODY,
            },
            Canned {
                status: "500 Internal Server Error",
                body: "{}",
            },
        )
        .await;

        let days = fetch_from(&api).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].readings[0].wave_height_m, 0.62);
        assert!(days
            .iter()
            .flat_map(|d| &d.readings)
            .all(|r| r.wind_speed_kmh.is_none() && r.wind_direction_deg.is_none()));
    }

    #[tokio::test]
    async fn test_malformed_wind_is_not_fatal() {
        let api = stub_server(
            Canned {
                status: OK,
                body: MARINE_BODY,
            },
            Canned {
                status: OK,
                body: r#"{"hourly": {"time": ["noon"]}}"#,
            },
        )
        .await;

        let days = fetch_from(&api).await.unwrap();
        assert!(days
            .iter()
            .flat_map(|d| &d.readings)
            .all(|r| r.wind_speed_kmh.is_none()));
    }

    #[tokio::test]
    async fn test_both_endpoints_merge() {
        let api = stub_server(
            Canned {
                status: OK,
                body: MARINE_BODY,
            },
            Canned {
                status: OK,
                body: WIND_BODY,
            },
        )
        .await;

        let days = fetch_from(&api).await.unwrap();
        assert_eq!(days[0].readings[0].wind_speed_kmh, Some(12.4));
        assert_eq!(days[1].readings[0].wind_direction_deg, Some(295.0));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let api = ApiConfig {
            marine_url: "http://127.0.0.1:1/v1/marine".to_string(),
            weather_url: "http://127.0.0.1:1/v1/forecast".to_string(),
            timeout_secs: 2,
        };
        let client = ForecastClient::new(&api).unwrap();
        let result = client
            .fetch_forecast(41.5089, 2.3944, 3, "Europe/Madrid")
            .await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_zero_days_rejected_before_request() {
        let client = ForecastClient::new(&ApiConfig::default()).unwrap();
        let result = client.fetch_forecast(41.5089, 2.3944, 0, "Europe/Madrid").await;
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));
    }
}
