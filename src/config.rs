/// Monitor configuration, loaded from a TOML file.
///
/// All range checks happen once, at load time. The core only ever sees a
/// validated `MonitorConfig` value — there are no string lookups inside
/// the evaluation path. A missing config file is not an error: the monitor
/// falls back to defaults with a logged warning, which keeps a fresh
/// deployment usable before anyone writes a config.

use std::path::Path;

use serde::Deserialize;

use crate::alert::cooldown::DEFAULT_COOLDOWN_HOURS;
use crate::ingest::gfz::DEFAULT_FORECAST_URL;
use crate::logging::{self, Component};
use crate::model::{MonitorError, Statistic};

// ---------------------------------------------------------------------------
// Configuration struct
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// URL of the forecast CSV product.
    #[serde(default = "default_csv_url")]
    pub csv_url: String,

    /// Kp value at or above which a forecast row breaches. Domain [0, 9].
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Which per-row statistic drives breach detection.
    #[serde(default)]
    pub statistic: Statistic,

    /// Minimum hours between two fired alerts. Must be positive.
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: f64,

    /// Continuous-mode check cadence in hours. Operator policy — this is
    /// deliberately independent of the upstream 3-hour publication cycle.
    #[serde(default = "default_check_interval_hours")]
    pub check_interval_hours: f64,

    /// Alert recipients. May be empty, in which case fired alerts are
    /// logged but nothing is mailed.
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Envelope sender handed to the local MTA.
    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    /// Path of the persisted alert state record.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Path of the log file.
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_csv_url() -> String {
    DEFAULT_FORECAST_URL.to_string()
}

fn default_threshold() -> f64 {
    5.0
}

fn default_cooldown_hours() -> f64 {
    DEFAULT_COOLDOWN_HOURS as f64
}

fn default_check_interval_hours() -> f64 {
    3.0
}

fn default_mail_from() -> String {
    "pager".to_string()
}

fn default_state_file() -> String {
    "kp_alert_state.json".to_string()
}

fn default_log_file() -> String {
    "kp_monitor.log".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            csv_url: default_csv_url(),
            threshold: default_threshold(),
            statistic: Statistic::default(),
            cooldown_hours: default_cooldown_hours(),
            check_interval_hours: default_check_interval_hours(),
            recipients: Vec::new(),
            mail_from: default_mail_from(),
            state_file: default_state_file(),
            log_file: default_log_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl MonitorConfig {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, MonitorError> {
        let config: MonitorConfig =
            toml::from_str(text).map_err(|e| MonitorError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults with a
    /// warning when the file does not exist. An existing but invalid file
    /// is an error — silently ignoring a bad config is worse than failing.
    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        if !path.exists() {
            logging::warn(
                Component::System,
                path.to_str(),
                "config file not found, using default configuration",
            );
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::ConfigError(e.to_string()))?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<(), MonitorError> {
        if !(0.0..=9.0).contains(&self.threshold) {
            return Err(MonitorError::ConfigError(format!(
                "threshold {} outside the Kp domain [0, 9]",
                self.threshold
            )));
        }
        if !(self.cooldown_hours > 0.0) {
            return Err(MonitorError::ConfigError(format!(
                "cooldown_hours must be positive, got {}",
                self.cooldown_hours
            )));
        }
        if !(self.check_interval_hours > 0.0) {
            return Err(MonitorError::ConfigError(format!(
                "check_interval_hours must be positive, got {}",
                self.check_interval_hours
            )));
        }
        if self.csv_url.is_empty() {
            return Err(MonitorError::ConfigError("csv_url is empty".to_string()));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds((self.cooldown_hours * 3600.0) as i64)
    }

    pub fn check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.check_interval_hours * 3600.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = MonitorConfig::from_toml("").unwrap();
        assert_eq!(config.threshold, 5.0);
        assert_eq!(config.statistic, Statistic::Maximum);
        assert_eq!(config.cooldown_hours, 6.0);
        assert_eq!(config.check_interval_hours, 3.0);
        assert_eq!(config.csv_url, DEFAULT_FORECAST_URL);
        assert!(config.recipients.is_empty());
    }

    #[test]
    fn test_full_config_parses() {
        let text = r#"
            csv_url = "https://example.org/kp.csv"
            threshold = 4.0
            statistic = "median"
            cooldown_hours = 12.0
            check_interval_hours = 1.5
            recipients = ["spaceweather@institution.edu"]
            mail_from = "kp-monitor"
            state_file = "/var/lib/kpmon/state.json"
            log_file = "/var/log/kpmon.log"
        "#;
        let config = MonitorConfig::from_toml(text).unwrap();
        assert_eq!(config.threshold, 4.0);
        assert_eq!(config.statistic, Statistic::Median);
        assert_eq!(config.cooldown_hours, 12.0);
        assert_eq!(config.recipients, vec!["spaceweather@institution.edu"]);
    }

    #[test]
    fn test_threshold_outside_domain_is_rejected() {
        for text in ["threshold = 9.5", "threshold = -0.1"] {
            match MonitorConfig::from_toml(text) {
                Err(MonitorError::ConfigError(msg)) => {
                    assert!(msg.contains("threshold"), "got: {}", msg)
                }
                other => panic!("expected ConfigError, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_threshold_boundaries_are_accepted() {
        assert!(MonitorConfig::from_toml("threshold = 0.0").is_ok());
        assert!(MonitorConfig::from_toml("threshold = 9.0").is_ok());
    }

    #[test]
    fn test_non_positive_durations_are_rejected() {
        assert!(MonitorConfig::from_toml("cooldown_hours = 0.0").is_err());
        assert!(MonitorConfig::from_toml("cooldown_hours = -6.0").is_err());
        assert!(MonitorConfig::from_toml("check_interval_hours = 0.0").is_err());
    }

    #[test]
    fn test_unknown_statistic_name_is_rejected() {
        assert!(MonitorConfig::from_toml("statistic = \"p95\"").is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        // Catches typos like "treshold" that would otherwise silently
        // leave the default in effect.
        assert!(MonitorConfig::from_toml("treshold = 4.0").is_err());
    }

    #[test]
    fn test_cooldown_converts_to_duration() {
        let config = MonitorConfig::from_toml("cooldown_hours = 1.5").unwrap();
        assert_eq!(config.cooldown(), chrono::Duration::minutes(90));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let config =
            MonitorConfig::load(Path::new("/nonexistent/kpmon.toml")).unwrap();
        assert_eq!(config.threshold, 5.0);
    }
}
