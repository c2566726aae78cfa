/// Core data types for the Kp index space weather monitor.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and no evaluation logic — only types and small
/// accessors over them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Probability buckets
// ---------------------------------------------------------------------------

/// The fixed set of Kp exceedance probability buckets published with each
/// forecast row. Buckets can overlap by design and need not sum to 1.
pub const PROB_BUCKETS: &[&str] = &["4-5", "5-6", "6-7", "7-8", ">=8"];

// ---------------------------------------------------------------------------
// Forecast types
// ---------------------------------------------------------------------------

/// One timestamped ensemble prediction from the GFZ Kp forecast product.
///
/// Statistical fields are `Option` because the upstream column set varies
/// and a missing or unparseable value is absent data, not an error.
/// Constructed once per parsed input row and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    /// Forecast valid time, parsed from the `dd-mm-yyyy HH:MM` field.
    pub timestamp: DateTime<Utc>,
    pub minimum: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub maximum: Option<f64>,
    /// Exceedance probabilities keyed by bucket label, in the order the
    /// columns appeared in the source. Values are expected in [0, 1].
    pub probabilities: Vec<(String, f64)>,
    /// Individual ensemble member predictions. The member count varies
    /// between runs (12–20); identity is positional, not a stable ID.
    pub members: Vec<f64>,
}

/// A parsed forecast: rows in ascending timestamp order, plus the row-level
/// warnings accumulated while parsing (dropped rows, absent or
/// out-of-domain values). Discarded after each evaluation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTimeline {
    pub rows: Vec<ForecastRow>,
    pub warnings: Vec<String>,
}

impl ForecastTimeline {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Statistic selector
// ---------------------------------------------------------------------------

/// Which per-row statistic drives breach detection and the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Minimum,
    #[serde(rename = "q25")]
    Q25,
    Median,
    #[serde(rename = "q75")]
    Q75,
    #[default]
    Maximum,
}

impl Statistic {
    /// Extracts this statistic from a row. `None` means the source did not
    /// carry the column (or the value was unparseable) for this row.
    pub fn select(&self, row: &ForecastRow) -> Option<f64> {
        match self {
            Statistic::Minimum => row.minimum,
            Statistic::Q25 => row.q25,
            Statistic::Median => row.median,
            Statistic::Q75 => row.q75,
            Statistic::Maximum => row.maximum,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Minimum => "minimum",
            Statistic::Q25 => "q25",
            Statistic::Median => "median",
            Statistic::Q75 => "q75",
            Statistic::Maximum => "maximum",
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation types
// ---------------------------------------------------------------------------

/// Result of scanning one timeline against a threshold. Transient — computed
/// fresh each run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    /// Rows whose selected statistic met or exceeded the threshold, in
    /// timeline order.
    pub breaching_rows: Vec<ForecastRow>,
    /// Selected statistic of the row nearest to "now" (first row at or
    /// after now, or the last row if the whole timeline is in the past).
    /// `None` if that row does not carry the statistic.
    pub current_max: Option<f64>,
    /// Severity of the maximum selected statistic observed anywhere in the
    /// timeline. `None` when no row carried the statistic.
    pub highest_classification: Option<crate::alert::severity::StormLevel>,
    /// True if any row's selected statistic reached 6.0 (G2+), the level at
    /// which aurora visibility becomes plausible at mid latitudes. This is
    /// independent of the alert threshold.
    pub aurora_possible: bool,
    /// Rows skipped because the selected statistic was absent.
    pub skipped_rows: usize,
    pub threshold: f64,
    pub statistic: Statistic,
}

impl EvaluationResult {
    pub fn alert_worthy(&self) -> bool {
        !self.breaching_rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Alert state types
// ---------------------------------------------------------------------------

/// The only data that survives across process invocations. Serialized as a
/// small JSON record; see `alert::cooldown::AlertStateStore`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertState {
    /// When the last alert fired, or `None` if none has fired yet.
    pub last_alert_time: Option<DateTime<Utc>>,
    /// The statistic value that triggered the last alert.
    pub last_alert_max_kp: Option<f64>,
}

/// Why `decide` reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireReason {
    /// No row breached the threshold; state is irrelevant.
    NoBreach,
    /// Breaches exist but a previous alert is still inside its cooldown.
    Cooldown,
    /// Breaches exist and the tracker is armed.
    NewAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireDecision {
    pub should_fire: bool,
    pub reason: FireReason,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching, parsing, or acting on a forecast.
///
/// Every variant is recoverable at the cycle level: the monitoring loop
/// logs it, skips the cycle, and retries on the next tick.
#[derive(Debug, PartialEq)]
pub enum MonitorError {
    /// Non-2xx HTTP response from the forecast endpoint.
    HttpError(u16),
    /// The request itself failed (connect, timeout, TLS).
    FetchError(String),
    /// The CSV header was present but unusable (no time column).
    ParseError(String),
    /// The input had no rows that parsed successfully, including empty
    /// input. Treated as "no data": no alert decision is made and state
    /// is unchanged.
    EmptyTimeline,
    /// The persisted alert state could not be read. Recovered locally by
    /// falling back to an armed default; never propagated.
    StateCorrupt(String),
    /// Configuration failed validation at load time.
    ConfigError(String),
    /// The mail transport rejected the message hand-off.
    MailError(String),
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::HttpError(code) => write!(f, "HTTP error: {}", code),
            MonitorError::FetchError(msg) => write!(f, "Fetch error: {}", msg),
            MonitorError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            MonitorError::EmptyTimeline => write!(f, "No usable forecast rows in input"),
            MonitorError::StateCorrupt(msg) => write!(f, "Alert state unreadable: {}", msg),
            MonitorError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            MonitorError::MailError(msg) => write!(f, "Mail delivery error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
