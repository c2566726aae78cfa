/// Forecast analysis for the Kp monitoring service.
///
/// Submodules:
/// - `evaluation` — scans a parsed timeline against the alert threshold.

pub mod evaluation;
