//! # Configuration Management
//!
//! This module builds the single immutable [`Config`] value the rest of the
//! application reads. Sources are layered, lowest precedence first:
//!
//! 1. Built-in defaults (Vilassar de Mar / Montgat, 0.5 m threshold)
//! 2. `surf-config.toml` in the working directory
//! 3. Process environment (`SURF_THRESHOLD`, `LOCATION_LAT`, ...)
//! 4. A local `.env` file, loaded in override mode so it wins over the shell
//!
//! The config is validated once at startup and then passed by reference into
//! each pipeline stage; nothing reads process-wide state after that.

use crate::quality::SpotProfile;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, relative to the working directory
pub const CONFIG_FILE: &str = "surf-config.toml";

/// Default local override file, relative to the working directory
pub const ENV_FILE: &str = ".env";

/// Credential values shipped in sample configs that must never be used
const PLACEHOLDER_CREDENTIALS: [&str; 2] = ["your-email@gmail.com", "your-app-password"];

/// Errors raised while assembling or validating the configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// A setting parsed fine but is outside its allowed range
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The local override file exists but could not be read or parsed
    #[error("unreadable override file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Where to look for waves
    pub location: LocationConfig,
    /// When to raise an alert
    pub alert: AlertConfig,
    /// SMTP delivery settings
    pub email: EmailConfig,
    /// Forecast provider endpoints
    pub api: ApiConfig,
    /// Spot geometry used by quality scoring
    pub spot: SpotProfile,
}

/// Forecast location
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Human-readable label shown in the report header
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone of the spot; both the API timestamps and "tomorrow" use it
    pub timezone: String,
}

/// Alert decision settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum wave height in metres for an hour to qualify
    pub threshold_m: f64,
    /// Days requested from the provider (today counts as one)
    pub forecast_days: u8,
    /// Deliver the "no surf" report through the notifier as well
    pub notify_on_no_alert: bool,
    /// Annotate qualifying hours with a surf quality score
    pub show_quality: bool,
}

/// Email notifier settings
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub recipient: String,
}

/// Forecast provider endpoints
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Open-Meteo marine endpoint (waves)
    pub marine_url: String,
    /// Open-Meteo weather endpoint (wind)
    pub weather_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            name: "Vilassar de Mar / Montgat".to_string(),
            latitude: 41.5089,
            longitude: 2.3944,
            timezone: "Europe/Madrid".to_string(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            threshold_m: 0.5,
            forecast_days: 3,
            notify_on_no_alert: false,
            show_quality: true,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            enabled: false,
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: String::new(),
            password: String::new(),
            recipient: String::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            marine_url: "https://marine-api.open-meteo.com/v1/marine".to_string(),
            weather_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_secs: 20,
        }
    }
}

// Keep the app password out of debug logs
impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl Config {
    /// Build the runtime configuration from every layer and validate it.
    ///
    /// The `.env` override file is expected to have been applied to the
    /// process environment already (see [`load_env_override`]).
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_path(CONFIG_FILE);
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!("Loaded configuration for {}", config.location.name);
                    config
                }
                Err(e) => {
                    log::warn!("Invalid config file format: {}", e);
                    log::warn!("Using default configuration (Vilassar de Mar / Montgat)");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Overlay environment variables on top of the file configuration.
    ///
    /// `lookup` returns the raw value for a key, or `None` when unset. Empty
    /// values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SURF_THRESHOLD") {
            self.alert.threshold_m = parse_value("SURF_THRESHOLD", &v)?;
        }
        if let Some(v) = get("LOCATION_LAT") {
            self.location.latitude = parse_value("LOCATION_LAT", &v)?;
        }
        if let Some(v) = get("LOCATION_LON") {
            self.location.longitude = parse_value("LOCATION_LON", &v)?;
        }
        if let Some(v) = get("LOCATION_TIMEZONE") {
            self.location.timezone = v.trim().to_string();
        }
        if let Some(v) = get("FORECAST_DAYS") {
            self.alert.forecast_days = parse_value("FORECAST_DAYS", &v)?;
        }
        if let Some(v) = get("EMAIL_ENABLED") {
            self.email.enabled = parse_bool("EMAIL_ENABLED", &v)?;
        }
        if let Some(v) = get("SMTP_SERVER") {
            self.email.smtp_server = v.trim().to_string();
        }
        if let Some(v) = get("SMTP_PORT") {
            self.email.smtp_port = parse_value("SMTP_PORT", &v)?;
        }
        if let Some(v) = get("SURF_ALERT_EMAIL") {
            self.email.sender = v.trim().to_string();
        }
        if let Some(v) = get("SURF_ALERT_PASSWORD") {
            self.email.password = v;
        }
        if let Some(v) = get("SURF_ALERT_RECIPIENT") {
            self.email.recipient = v.trim().to_string();
        }
        Ok(())
    }

    /// Check ranges and cross-field requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.alert.threshold_m;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "threshold must be a non-negative number of metres, got {threshold}"
            )));
        }
        if !(-90.0..=90.0).contains(&self.location.latitude) {
            return Err(ConfigError::Invalid(format!(
                "latitude {} is outside -90..=90",
                self.location.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            return Err(ConfigError::Invalid(format!(
                "longitude {} is outside -180..=180",
                self.location.longitude
            )));
        }
        if !(2..=16).contains(&self.alert.forecast_days) {
            return Err(ConfigError::Invalid(format!(
                "forecast_days must be between 2 and 16 to cover tomorrow, got {}",
                self.alert.forecast_days
            )));
        }
        self.timezone()?;

        if self.email.enabled {
            let creds = [
                ("SURF_ALERT_EMAIL", &self.email.sender),
                ("SURF_ALERT_PASSWORD", &self.email.password),
                ("SURF_ALERT_RECIPIENT", &self.email.recipient),
            ];
            for (key, value) in creds {
                if value.is_empty() || PLACEHOLDER_CREDENTIALS.contains(&value.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "email is enabled but {key} is not set"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parsed IANA zone of the forecast location
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.location
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown time zone {:?}", self.location.timezone)))
    }
}

/// Apply a local `.env` file to the process environment, overriding values
/// already exported by the shell.
///
/// Returns `Ok(false)` when there is no file. A file that exists but does not
/// parse is an error: dotenvy may already have applied the lines before the
/// bad one, so the run must not go on with a half-applied override.
pub fn load_env_override<P: AsRef<Path>>(path: P) -> Result<bool, ConfigError> {
    match dotenvy::from_path_override(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ConfigError::EnvFile {
            path: path.as_ref().display().to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
