/// Development mode utilities for working with saved forecast files.
///
/// When the live GFZ endpoint is unavailable (or a specific forecast needs
/// replaying), this module reads a previously saved CSV from disk and can
/// shift "now" backwards so an archived file still has rows in its future
/// window.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use crate::model::MonitorError;

/// Configuration for forecast replay from a local file.
pub struct DevMode {
    /// Path of the saved forecast CSV.
    pub csv_path: PathBuf,
    /// Evaluate as if "now" were this many days in the past.
    pub days_offset: i64,
}

impl DevMode {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            days_offset: 0,
        }
    }

    pub fn with_days_offset(mut self, days_offset: i64) -> Self {
        self.days_offset = days_offset;
        self
    }

    /// Reads the saved CSV body, standing in for the HTTP fetch.
    pub fn read_forecast_csv(&self) -> Result<String, MonitorError> {
        std::fs::read_to_string(&self.csv_path).map_err(|e| {
            MonitorError::FetchError(format!(
                "could not read {}: {}",
                self.csv_path.display(),
                e
            ))
        })
    }

    /// The clock to evaluate against: real time shifted back by the
    /// configured offset.
    pub fn simulated_now(&self) -> DateTime<Utc> {
        Utc::now() - Duration::days(self.days_offset)
    }
}
