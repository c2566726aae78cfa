/// Threshold evaluation over a parsed forecast timeline.
///
/// Pure and deterministic: the same timeline, threshold, statistic, and
/// clock always produce the same `EvaluationResult`. The only effect is
/// logging of skipped rows.
///
/// # Clock injection
/// `evaluate` takes `now: DateTime<Utc>` rather than reading the system
/// clock, so the "nearest-future row" selection is deterministic in tests.

use chrono::{DateTime, Utc};

use crate::alert::severity::classify;
use crate::logging::{self, Component};
use crate::model::{EvaluationResult, ForecastRow, ForecastTimeline, Statistic};

/// Selected statistic level at or above which aurora visibility becomes
/// plausible (G2+ by domain convention). Independent of the alert threshold.
pub const AURORA_KP: f64 = 6.0;

/// The row that represents "current conditions": the first row at or after
/// `now`, or the last row if the whole timeline is in the past.
pub fn current_row<'a>(
    rows: &'a [ForecastRow],
    now: DateTime<Utc>,
) -> Option<&'a ForecastRow> {
    rows.iter()
        .find(|r| r.timestamp >= now)
        .or_else(|| rows.last())
}

/// Scans `timeline` for rows whose selected statistic meets or exceeds
/// `threshold`.
///
/// Rows without the selected statistic are skipped — they count neither as
/// breach nor non-breach — and are tallied in `skipped_rows`.
pub fn evaluate(
    timeline: &ForecastTimeline,
    threshold: f64,
    statistic: Statistic,
    now: DateTime<Utc>,
) -> EvaluationResult {
    let mut breaching_rows = Vec::new();
    let mut skipped_rows = 0usize;
    let mut observed_max: Option<f64> = None;
    let mut aurora_possible = false;

    for row in &timeline.rows {
        let value = match statistic.select(row) {
            Some(v) => v,
            None => {
                skipped_rows += 1;
                continue;
            }
        };

        observed_max = Some(match observed_max {
            Some(m) if m >= value => m,
            _ => value,
        });

        if value >= AURORA_KP {
            aurora_possible = true;
        }

        if value >= threshold {
            breaching_rows.push(row.clone());
        }
    }

    if skipped_rows > 0 {
        logging::debug(
            Component::Eval,
            None,
            &format!(
                "{} rows skipped: no '{}' value present",
                skipped_rows,
                statistic.name()
            ),
        );
    }

    let current_max = current_row(&timeline.rows, now).and_then(|r| statistic.select(r));

    EvaluationResult {
        breaching_rows,
        current_max,
        highest_classification: observed_max.map(classify),
        aurora_possible,
        skipped_rows,
        threshold,
        statistic,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::severity::StormLevel;
    use chrono::TimeZone;

    fn row_at(hour: u32, maximum: Option<f64>) -> ForecastRow {
        ForecastRow {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap(),
            minimum: maximum.map(|m| m - 2.0),
            q25: None,
            median: maximum.map(|m| m - 1.0),
            q75: None,
            maximum,
            probabilities: Vec::new(),
            members: Vec::new(),
        }
    }

    fn timeline(rows: Vec<ForecastRow>) -> ForecastTimeline {
        ForecastTimeline {
            rows,
            warnings: Vec::new(),
        }
    }

    /// A fixed "now" before every row in the test timelines.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 30, 0).unwrap()
    }

    #[test]
    fn test_storm_forecast_breaches_and_sets_aurora_flag() {
        // Maxima [4.3, 6.33, 5.67] against threshold 5.0: rows 2 and 3
        // breach, and 6.33 >= 6 raises the aurora flag.
        let tl = timeline(vec![
            row_at(3, Some(4.3)),
            row_at(6, Some(6.33)),
            row_at(9, Some(5.67)),
        ]);
        let result = evaluate(&tl, 5.0, Statistic::Maximum, fixed_now());

        let breached: Vec<f64> = result
            .breaching_rows
            .iter()
            .filter_map(|r| r.maximum)
            .collect();
        assert_eq!(breached, vec![6.33, 5.67]);
        assert!(result.aurora_possible, "6.33 >= 6 should set the aurora flag");
        // Nearest-future row at 03:00 carries the current value.
        assert_eq!(result.current_max, Some(4.3));
        assert_eq!(result.highest_classification, Some(StormLevel::Moderate));
        assert!(result.alert_worthy());
    }

    #[test]
    fn test_breach_is_inclusive_at_the_threshold() {
        let tl = timeline(vec![row_at(3, Some(5.0))]);
        let result = evaluate(&tl, 5.0, Statistic::Maximum, fixed_now());
        assert_eq!(result.breaching_rows.len(), 1, "value == threshold breaches");
    }

    #[test]
    fn test_no_breach_below_threshold() {
        let tl = timeline(vec![row_at(3, Some(4.99)), row_at(6, Some(2.0))]);
        let result = evaluate(&tl, 5.0, Statistic::Maximum, fixed_now());
        assert!(result.breaching_rows.is_empty());
        assert!(!result.alert_worthy());
        assert!(!result.aurora_possible);
        assert_eq!(result.highest_classification, Some(StormLevel::Active));
    }

    #[test]
    fn test_rows_without_statistic_are_skipped_not_counted() {
        let tl = timeline(vec![
            row_at(3, None),
            row_at(6, Some(7.0)),
            row_at(9, None),
        ]);
        let result = evaluate(&tl, 5.0, Statistic::Maximum, fixed_now());
        assert_eq!(result.skipped_rows, 2);
        assert_eq!(result.breaching_rows.len(), 1);
    }

    #[test]
    fn test_current_value_uses_first_row_at_or_after_now() {
        let tl = timeline(vec![
            row_at(3, Some(4.0)),
            row_at(6, Some(5.5)),
            row_at(9, Some(3.0)),
        ]);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
        let result = evaluate(&tl, 9.0, Statistic::Maximum, now);
        assert_eq!(result.current_max, Some(5.5), "first future row is 06:00");
    }

    #[test]
    fn test_current_value_falls_back_to_last_row_when_all_past() {
        let tl = timeline(vec![row_at(3, Some(4.0)), row_at(6, Some(5.5))]);
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let result = evaluate(&tl, 9.0, Statistic::Maximum, now);
        assert_eq!(result.current_max, Some(5.5), "all rows past: use the last");
    }

    #[test]
    fn test_current_value_exactly_at_now_counts_as_future() {
        let tl = timeline(vec![row_at(3, Some(4.0)), row_at(6, Some(5.5))]);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 3, 0, 0).unwrap();
        let result = evaluate(&tl, 9.0, Statistic::Maximum, now);
        assert_eq!(result.current_max, Some(4.0), "timestamp == now is 'current'");
    }

    #[test]
    fn test_evaluation_respects_the_statistic_selector() {
        // Median of row is maximum - 1.0; with threshold 5.0 only the
        // 6.33 row breaches on median.
        let tl = timeline(vec![
            row_at(3, Some(5.5)),
            row_at(6, Some(6.33)),
        ]);
        let result = evaluate(&tl, 5.0, Statistic::Median, fixed_now());
        let breached: Vec<f64> = result
            .breaching_rows
            .iter()
            .filter_map(|r| r.median)
            .collect();
        assert_eq!(breached, vec![5.33]);
        assert!(!result.aurora_possible, "medians stay below 6.0");
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let tl = timeline(vec![
            row_at(3, Some(4.3)),
            row_at(6, Some(6.33)),
            row_at(9, Some(5.67)),
        ]);
        let a = evaluate(&tl, 5.0, Statistic::Maximum, fixed_now());
        let b = evaluate(&tl, 5.0, Statistic::Maximum, fixed_now());
        assert_eq!(a, b);
    }

    #[test]
    fn test_evaluator_functions_on_out_of_domain_values() {
        // Parser lets out-of-range values through with a warning; the
        // evaluator must still work over them.
        let tl = timeline(vec![row_at(3, Some(11.5))]);
        let result = evaluate(&tl, 5.0, Statistic::Maximum, fixed_now());
        assert_eq!(result.breaching_rows.len(), 1);
        assert_eq!(result.highest_classification, Some(StormLevel::Extreme));
    }

    #[test]
    fn test_all_rows_skipped_yields_empty_result() {
        let tl = timeline(vec![row_at(3, None), row_at(6, None)]);
        let result = evaluate(&tl, 5.0, Statistic::Maximum, fixed_now());
        assert_eq!(result.skipped_rows, 2);
        assert!(result.breaching_rows.is_empty());
        assert_eq!(result.highest_classification, None);
        assert_eq!(result.current_max, None);
    }
}
