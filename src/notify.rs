/// Alert and summary message composition, plus mail hand-off.
///
/// The composers are pure functions over evaluation output so they can be
/// tested without a transport. Delivery pipes the finished message into
/// the local `sendmail` binary; anything past that hand-off is out of
/// scope for this service.

use std::io::Write;
use std::process::{Command, Stdio};

use chrono::{DateTime, Utc};

use crate::alert::severity::classify;
use crate::analysis::evaluation::AURORA_KP;
use crate::config::MonitorConfig;
use crate::logging::{self, Component};
use crate::model::{EvaluationResult, ForecastTimeline, MonitorError};

/// Forecast periods shown in the summary's next-24-hours section
/// (8 periods x 3 hours).
const SUMMARY_PERIODS: usize = 8;

// ============================================================================
// Subjects
// ============================================================================

pub fn alert_subject(evaluation: &EvaluationResult) -> String {
    let max = evaluation.current_max.unwrap_or(0.0);
    format!("SPACE WEATHER ALERT: High Kp Index ({:.1}) Detected", max)
}

pub fn summary_subject(evaluation: &EvaluationResult) -> String {
    let max = evaluation.current_max.unwrap_or(0.0);
    format!("Space Weather Summary Report - Current Kp: {:.1}", max)
}

// ============================================================================
// Shared fragments
// ============================================================================

/// The NOAA storm level legend included in both message kinds.
fn storm_legend() -> &'static str {
    "<ul>\n\
     <li><strong>Kp 5:</strong> Minor geomagnetic storm (G1)</li>\n\
     <li><strong>Kp 6:</strong> Moderate geomagnetic storm (G2)</li>\n\
     <li><strong>Kp 7:</strong> Strong geomagnetic storm (G3)</li>\n\
     <li><strong>Kp 8:</strong> Severe geomagnetic storm (G4)</li>\n\
     <li><strong>Kp 9:</strong> Extreme geomagnetic storm (G5)</li>\n\
     </ul>\n"
}

fn footer(csv_url: &str, kind: &str) -> String {
    format!(
        "<p><strong>DATA SOURCE:</strong> {}</p>\n\n\
         <p><em>This is an automated {} from the Kp Index Monitoring System.</em></p>\n\
         </body></html>",
        csv_url, kind
    )
}

// ============================================================================
// Alert message
// ============================================================================

/// Builds the HTML alert body: current maximum, threshold, alert time, the
/// breaching periods, and the storm level legend.
pub fn compose_alert_html(
    evaluation: &EvaluationResult,
    config: &MonitorConfig,
    now: DateTime<Utc>,
) -> String {
    let max = evaluation.current_max.unwrap_or(0.0);

    let mut message = format!(
        "<html><body>\n\
         <h2><strong>SPACE WEATHER ALERT - High Kp Index Detected</strong></h2>\n\n\
         <h3><strong>ALERT SUMMARY:</strong></h3>\n\
         <ul>\n\
         <li><strong>Current Maximum Kp Index:</strong> {:.2}</li>\n\
         <li><strong>Alert Threshold:</strong> {} ({})</li>\n\
         <li><strong>Alert Time:</strong> {} UTC</li>\n",
        max,
        config.threshold,
        evaluation.statistic.name(),
        now.format("%Y-%m-%d %H:%M:%S"),
    );

    if let Some(level) = evaluation.highest_classification {
        message.push_str(&format!(
            "<li><strong>Peak Severity:</strong> {}</li>\n",
            level
        ));
    }
    if evaluation.aurora_possible {
        message.push_str(&format!(
            "<li><strong>Aurora:</strong> possible (Kp ≥ {} forecast)</li>\n",
            AURORA_KP
        ));
    }
    message.push_str("</ul>\n\n<h3><strong>HIGH KP INDEX PERIODS DETECTED:</strong></h3>\n<ul>\n");

    for row in &evaluation.breaching_rows {
        if let Some(value) = evaluation.statistic.select(row) {
            message.push_str(&format!(
                "<li><strong>{} UTC:</strong> Kp = {:.2}</li>\n",
                row.timestamp.format("%d-%m-%Y %H:%M"),
                value
            ));
        }
    }

    message.push_str("</ul>\n\n<h3><strong>GEOMAGNETIC STORM LEVELS:</strong></h3>\n");
    message.push_str(storm_legend());
    message.push('\n');
    message.push_str(&footer(&config.csv_url, "alert"));
    message
}

// ============================================================================
// Summary message
// ============================================================================

/// Builds the HTML summary body: current status with its storm class, the
/// next-24-hours forecast table, and the activity scale legend.
pub fn compose_summary_html(
    timeline: &ForecastTimeline,
    evaluation: &EvaluationResult,
    config: &MonitorConfig,
    now: DateTime<Utc>,
) -> String {
    let current = evaluation.current_max.unwrap_or(0.0);
    let level = classify(current);

    let status = match level.noaa_scale() {
        Some(scale) => format!("{} CONDITIONS [{}]", level.label().to_uppercase(), scale),
        None => format!("{} CONDITIONS", level.label().to_uppercase()),
    };

    let mut message = format!(
        "<html><body>\n\
         <h2><strong>SPACE WEATHER - KP Index SUMMARY REPORT</strong></h2>\n\n\
         <h3><strong>CURRENT STATUS:</strong> {}</h3>\n\
         <ul>\n\
         <li><strong>Report Time:</strong> {} UTC</li>\n\
         <li><strong>Current Maximum KP:</strong> {:.2}</li>\n\
         <li><strong>Alert Threshold:</strong> {}</li>\n\
         </ul>\n\n\
         <h3><strong>NEXT 24 HOURS FORECAST:</strong></h3>\n\
         <ul>\n",
        status,
        now.format("%Y-%m-%d %H:%M:%S"),
        current,
        config.threshold,
    );

    if level.is_storm() {
        message.push_str(
            "<p><strong>Geomagnetic storm conditions are in progress. \
             Aurora may be visible at high latitudes.</strong></p>\n\n",
        );
    }

    let upcoming = timeline
        .rows
        .iter()
        .filter(|r| r.timestamp >= now)
        .take(SUMMARY_PERIODS);

    for row in upcoming {
        let Some(value) = evaluation.statistic.select(row) else {
            continue;
        };
        let indicator = if value >= config.threshold {
            "(ALERT)"
        } else if value >= 4.0 {
            "(ACTIVE)"
        } else {
            "(QUIET)"
        };
        message.push_str(&format!(
            "<li><strong>{} UTC:</strong> Kp = {:.2} {}</li>\n",
            row.timestamp.format("%d-%m-%Y %H:%M"),
            value,
            indicator
        ));
    }

    message.push_str("</ul>\n\n<h3><strong>GEOMAGNETIC ACTIVITY SCALE:</strong></h3>\n");
    message.push_str(storm_legend());
    message.push_str(
        "\n<h3><strong>FORECAST DATA SUMMARY:</strong></h3>\n\
         <p>The latest ensemble predictions contain the following information:</p>\n\
         <ul>\n\
         <li>Time in UTC format: dd-mm-yyyy HH:MM</li>\n\
         <li>Minimum, 0.25-quantile, median, 0.75-quantile, maximum forecasted values</li>\n\
         <li>Probability ranges for different Kp levels</li>\n\
         <li>Individual ensemble members (currently varies between 12-20 members)</li>\n\
         </ul>\n\n",
    );
    message.push_str(&footer(&config.csv_url, "summary"));
    message
}

// ============================================================================
// Delivery
// ============================================================================

/// Hands a finished HTML message to the local MTA via `sendmail -t`.
///
/// Success means the MTA accepted the message; delivery beyond that point
/// is explicitly not guaranteed by this service.
pub fn send_mail(
    config: &MonitorConfig,
    recipients: &[String],
    subject: &str,
    html_body: &str,
) -> Result<(), MonitorError> {
    if recipients.is_empty() {
        return Err(MonitorError::MailError("no recipients configured".to_string()));
    }

    let message = format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\n\
         Content-Type: text/html; charset=utf-8\r\n\r\n{}",
        config.mail_from,
        recipients.join(", "),
        subject,
        html_body
    );

    let mut child = Command::new("sendmail")
        .arg("-t")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| MonitorError::MailError(format!("failed to spawn sendmail: {}", e)))?;

    child
        .stdin
        .take()
        .ok_or_else(|| MonitorError::MailError("sendmail stdin unavailable".to_string()))?
        .write_all(message.as_bytes())
        .map_err(|e| MonitorError::MailError(e.to_string()))?;

    let status = child
        .wait()
        .map_err(|e| MonitorError::MailError(e.to_string()))?;
    if !status.success() {
        return Err(MonitorError::MailError(format!(
            "sendmail exited with {}",
            status
        )));
    }

    logging::info(
        Component::Mail,
        None,
        &format!("mail handed to MTA for {} recipient(s)", recipients.len()),
    );
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
