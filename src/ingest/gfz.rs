/// GFZ Potsdam Kp forecast endpoint client.
///
/// Retrieves the ensemble Kp forecast CSV published by the GFZ German
/// Research Centre for Geosciences. This is a collaborator around the core:
/// fetch failure means "no input this cycle", never a crash.
///
/// Data source: https://spaceweather.gfz.de/fileadmin/Kp-Forecast/CSV/

use std::time::Duration;

use crate::model::MonitorError;

/// Default URL of the latest combined PAGER/SWIFT forecast product.
pub const DEFAULT_FORECAST_URL: &str =
    "https://spaceweather.gfz.de/fileadmin/Kp-Forecast/CSV/kp_product_file_FORECAST_PAGER_SWIFT_LAST.csv";

/// The endpoint rejects requests without a browser-like User-Agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const FETCH_TIMEOUT_SECS: u64 = 30;

/// Builds the blocking client used for forecast fetches.
pub fn build_client() -> Result<reqwest::blocking::Client, MonitorError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| MonitorError::FetchError(e.to_string()))
}

/// Fetches the raw forecast CSV body from `url`.
///
/// # Returns
/// The response body as text. Non-2xx statuses map to
/// `MonitorError::HttpError`; transport failures to `FetchError`.
pub fn fetch_forecast_csv(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<String, MonitorError> {
    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .map_err(|e| MonitorError::FetchError(e.to_string()))?;

    if !response.status().is_success() {
        return Err(MonitorError::HttpError(response.status().as_u16()));
    }

    response
        .text()
        .map_err(|e| MonitorError::FetchError(e.to_string()))
}
