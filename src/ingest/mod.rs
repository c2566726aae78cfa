/// Forecast ingestion for the Kp monitoring service.
///
/// Submodules:
/// - `gfz` — blocking HTTP client for the GFZ forecast CSV endpoint.
/// - `forecast` — parses the raw CSV into a `ForecastTimeline`.

pub mod forecast;
pub mod gfz;
