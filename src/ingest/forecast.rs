/// GFZ Kp ensemble forecast CSV parser.
///
/// Turns the raw forecast product (header + comma-separated data rows) into
/// a time-ordered `ForecastTimeline`. Columns are identified by header name,
/// never by position, because the ensemble member count varies run to run
/// (12–20 members) and the statistical columns are not guaranteed present.
///
/// Expected columns (see the GFZ product documentation):
/// - `Time (UTC)` — forecast time in dd-mm-yyyy HH:MM format
/// - `minimum`, `0.25-quantile`, `median`, `0.75-quantile`, `maximum`
/// - `prob 4-5` … `prob >= 8` — exceedance probabilities
/// - ensemble member columns, indexed by an `_i` suffix
///
/// Row-level problems (unparseable timestamp, missing value, value outside
/// the 0–9 Kp domain) become accumulated warnings, not failures. The parse
/// fails only when the header is unusable or zero rows survive.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::model::{ForecastRow, ForecastTimeline, MonitorError, PROB_BUCKETS};

/// Timestamp format of the `Time (UTC)` column.
const TIME_FORMAT: &str = "%d-%m-%Y %H:%M";

// ============================================================================
// Header mapping
// ============================================================================

/// Where each recognized field lives in a data row, by column index.
#[derive(Debug, Default)]
struct ColumnMap {
    time: Option<usize>,
    minimum: Option<usize>,
    q25: Option<usize>,
    median: Option<usize>,
    q75: Option<usize>,
    maximum: Option<usize>,
    /// (column index, bucket label) pairs, in header order.
    probabilities: Vec<(usize, String)>,
    /// Ensemble member column indices, in header order.
    members: Vec<usize>,
}

/// Maps a probability header like `prob >= 8` or `prob 4-5` to its
/// canonical bucket label. Returns `None` for unrecognized buckets.
fn prob_bucket(header: &str) -> Option<String> {
    let rest = header.strip_prefix("prob")?.trim();
    let normalized: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
    if PROB_BUCKETS.contains(&normalized.as_str()) {
        Some(normalized)
    } else {
        None
    }
}

/// True for ensemble member columns, which carry an `_i` index suffix
/// (e.g. `kp_0`, `kp_12`).
fn is_member_column(header: &str) -> bool {
    match header.rsplit_once('_') {
        Some((name, index)) => {
            !name.is_empty() && !index.is_empty() && index.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn map_columns(header_line: &str) -> Result<ColumnMap, MonitorError> {
    let mut map = ColumnMap::default();

    for (i, raw) in header_line.split(',').enumerate() {
        let name = raw.trim();
        let lower = name.to_ascii_lowercase();

        if lower == "time (utc)" {
            map.time = Some(i);
        } else if lower == "minimum" {
            map.minimum = Some(i);
        } else if lower.contains("0.25") {
            map.q25 = Some(i);
        } else if lower == "median" {
            map.median = Some(i);
        } else if lower.contains("0.75") {
            map.q75 = Some(i);
        } else if lower == "maximum" {
            map.maximum = Some(i);
        } else if let Some(bucket) = prob_bucket(&lower) {
            map.probabilities.push((i, bucket));
        } else if is_member_column(name) {
            map.members.push(i);
        }
        // Anything else is an unrecognized column; ignored.
    }

    if map.time.is_none() {
        return Err(MonitorError::ParseError(
            "no 'Time (UTC)' column in header".to_string(),
        ));
    }

    Ok(map)
}

// ============================================================================
// Row parsing
// ============================================================================

/// Parses one field as a float, treating blank and "null" as absent.
fn parse_field(fields: &[&str], index: Option<usize>) -> Option<f64> {
    let raw = fields.get(index?)?.trim();
    if raw.is_empty() || raw == "null" {
        return None;
    }
    raw.parse().ok()
}

fn parse_row(
    fields: &[&str],
    map: &ColumnMap,
    line_no: usize,
    warnings: &mut Vec<String>,
) -> Option<ForecastRow> {
    // A row without a parseable timestamp cannot be placed on the timeline;
    // it is dropped with a warning rather than failing the whole parse.
    let time_field = fields.get(map.time?).map(|s| s.trim()).unwrap_or("");
    let timestamp = match NaiveDateTime::parse_from_str(time_field, TIME_FORMAT) {
        Ok(naive) => DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc),
        Err(_) => {
            warnings.push(format!(
                "line {}: unparseable timestamp '{}', row dropped",
                line_no, time_field
            ));
            return None;
        }
    };

    let minimum = parse_field(fields, map.minimum);
    let q25 = parse_field(fields, map.q25);
    let median = parse_field(fields, map.median);
    let q75 = parse_field(fields, map.q75);
    let maximum = parse_field(fields, map.maximum);

    let probabilities: Vec<(String, f64)> = map
        .probabilities
        .iter()
        .filter_map(|(i, bucket)| {
            parse_field(fields, Some(*i)).map(|v| (bucket.clone(), v))
        })
        .collect();

    let members: Vec<f64> = map
        .members
        .iter()
        .filter_map(|i| parse_field(fields, Some(*i)))
        .collect();

    // Data-quality checks: warn, never reject. The evaluator must still
    // function on out-of-range inputs.
    for (label, value) in [
        ("minimum", minimum),
        ("0.25-quantile", q25),
        ("median", median),
        ("0.75-quantile", q75),
        ("maximum", maximum),
    ] {
        if let Some(v) = value {
            if !(0.0..=9.0).contains(&v) {
                warnings.push(format!(
                    "line {}: {} = {} outside the 0-9 Kp domain",
                    line_no, label, v
                ));
            }
        }
    }

    let quantiles: Vec<f64> = [minimum, q25, median, q75, maximum]
        .into_iter()
        .flatten()
        .collect();
    if quantiles.windows(2).any(|w| w[0] > w[1]) {
        warnings.push(format!("line {}: quantiles are not in ascending order", line_no));
    }

    Some(ForecastRow {
        timestamp,
        minimum,
        q25,
        median,
        q75,
        maximum,
        probabilities,
        members,
    })
}

// ============================================================================
// Public API
// ============================================================================

/// Parses raw forecast CSV text into a time-ordered `ForecastTimeline`.
///
/// Returns `ParseError` if a header is present but carries no time column,
/// and `EmptyTimeline` if zero data rows parse successfully — including the
/// degenerate case of empty input, which has zero rows. Rows with
/// unparseable timestamps are dropped with a warning; the surviving rows
/// are sorted ascending by timestamp (stable, so source order breaks ties).
pub fn parse(raw_text: &str) -> Result<ForecastTimeline, MonitorError> {
    let mut lines = raw_text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or(MonitorError::EmptyTimeline)?;
    let map = map_columns(header)?;

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for (line_no, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        // line_no + 2: 1-based, counting the header.
        if let Some(row) = parse_row(&fields, &map, line_no + 2, &mut warnings) {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(MonitorError::EmptyTimeline);
    }

    // Vec::sort_by is stable; ties keep their original row order, which
    // keeps test output deterministic.
    rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    for w in &warnings {
        crate::logging::warn(crate::logging::Component::Parser, None, w);
    }

    Ok(ForecastTimeline { rows, warnings })
}

// ============================================================================
// Tests
// ============================================================================
