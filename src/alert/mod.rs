/// Alerting logic for the Kp monitoring service.
///
/// Submodules:
/// - `severity` — maps a Kp value to its storm class and NOAA G-scale tier.
/// - `cooldown` — alert state tracking and cooldown enforcement across runs.

pub mod cooldown;
pub mod severity;
