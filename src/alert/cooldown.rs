/// Alert state tracking and cooldown enforcement.
///
/// The tracker has two computed states: ARMED (no recent alert, eligible
/// to fire) and COOLDOWN (an alert fired within the cooldown window).
/// State is never pushed — it is derived from the persisted
/// `last_alert_time` on every decision, so COOLDOWN → ARMED happens by
/// itself once enough time has passed.
///
/// # Clock injection
/// All functions accept `now: DateTime<Utc>` rather than calling
/// `Utc::now()` internally, so cooldown arithmetic is deterministic in
/// tests without time manipulation.
///
/// # Fail-safe persistence
/// The persisted state is the only thing this crate writes. A missing or
/// corrupt state file falls back to ARMED with a logged warning — the
/// tracker must never crash the monitoring loop, and fail-armed is the
/// safe direction (an extra alert beats a silently suppressed one).
/// Writes go through a temp file plus atomic rename so a crash mid-write
/// cannot leave a half-written file to be rejected on the next read.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::logging::{self, Component};
use crate::model::{AlertState, EvaluationResult, FireDecision, FireReason, MonitorError};

/// Minimum hours between two fired alerts unless configured otherwise.
pub const DEFAULT_COOLDOWN_HOURS: i64 = 6;

/// The default cooldown as a `Duration`.
pub fn default_cooldown() -> Duration {
    Duration::hours(DEFAULT_COOLDOWN_HOURS)
}

// ---------------------------------------------------------------------------
// Pure decision
// ---------------------------------------------------------------------------

/// True if the tracker is armed at `now` given the persisted state:
/// no alert has ever fired, or the last one is at least `cooldown` old.
pub fn is_armed(state: &AlertState, now: DateTime<Utc>, cooldown: Duration) -> bool {
    match state.last_alert_time {
        None => true,
        Some(last) => now - last >= cooldown,
    }
}

/// Decides whether an alert fires, given an evaluation and the persisted
/// state. Pure: no I/O, no mutation, idempotent over identical inputs.
///
/// - no breaching rows             → `should_fire = false`, `NoBreach`
/// - breaches, but inside cooldown → `should_fire = false`, `Cooldown`
/// - breaches while armed          → `should_fire = true`,  `NewAlert`
pub fn decide(
    evaluation: &EvaluationResult,
    now: DateTime<Utc>,
    state: &AlertState,
    cooldown: Duration,
) -> FireDecision {
    if !evaluation.alert_worthy() {
        return FireDecision {
            should_fire: false,
            reason: FireReason::NoBreach,
        };
    }

    if !is_armed(state, now, cooldown) {
        return FireDecision {
            should_fire: false,
            reason: FireReason::Cooldown,
        };
    }

    FireDecision {
        should_fire: true,
        reason: FireReason::NewAlert,
    }
}

// ---------------------------------------------------------------------------
// State persistence
// ---------------------------------------------------------------------------

/// Owns the durable `AlertState` record. One monitor instance per
/// configuration is assumed (single writer); the atomic rename keeps an
/// accidental overlapping invocation from corrupting the file.
pub struct AlertStateStore {
    path: PathBuf,
}

impl AlertStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted state. A missing file is a normal first run;
    /// an unreadable or corrupt file is logged and treated the same way.
    /// Both yield the default (armed) state — this never returns an error
    /// to the caller.
    pub fn load(&self) -> AlertState {
        match self.try_load() {
            Ok(state) => state,
            Err(MonitorError::StateCorrupt(msg)) => {
                logging::warn(
                    Component::Alert,
                    self.path.to_str(),
                    &format!("alert state unreadable, falling back to armed: {}", msg),
                );
                AlertState::default()
            }
            Err(_) => AlertState::default(),
        }
    }

    fn try_load(&self) -> Result<AlertState, MonitorError> {
        if !self.path.exists() {
            return Ok(AlertState::default());
        }
        let text = fs::read_to_string(&self.path)
            .map_err(|e| MonitorError::StateCorrupt(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| MonitorError::StateCorrupt(e.to_string()))
    }

    /// Persists `state` via temp file + atomic rename.
    pub fn save(&self, state: &AlertState) -> Result<(), MonitorError> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| MonitorError::StateCorrupt(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| MonitorError::StateCorrupt(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| MonitorError::StateCorrupt(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Caller-facing wrapper
// ---------------------------------------------------------------------------

/// Loads the persisted state, makes the pure decision, and persists the
/// ARMED → COOLDOWN transition exactly when a new alert fires.
///
/// The persistence write is the only side effect in the core. A failed
/// write is logged but the decision stands — suppressing a real alert
/// over a bookkeeping failure would be the wrong trade.
pub fn check_and_update(
    store: &AlertStateStore,
    evaluation: &EvaluationResult,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> FireDecision {
    let state = store.load();
    let decision = decide(evaluation, now, &state, cooldown);

    if decision.should_fire {
        let new_state = AlertState {
            last_alert_time: Some(now),
            last_alert_max_kp: evaluation.current_max,
        };
        if let Err(e) = store.save(&new_state) {
            logging::error(
                Component::Alert,
                store.path().to_str(),
                &format!("failed to persist alert state: {}", e),
            );
        }
    }

    decision
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Statistic;
    use chrono::TimeZone;

    fn breaching_evaluation() -> EvaluationResult {
        let row = crate::model::ForecastRow {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            minimum: Some(4.0),
            q25: None,
            median: Some(5.5),
            q75: None,
            maximum: Some(6.33),
            probabilities: Vec::new(),
            members: Vec::new(),
        };
        EvaluationResult {
            breaching_rows: vec![row],
            current_max: Some(6.33),
            highest_classification: Some(crate::alert::severity::StormLevel::Moderate),
            aurora_possible: true,
            skipped_rows: 0,
            threshold: 5.0,
            statistic: Statistic::Maximum,
        }
    }

    fn quiet_evaluation() -> EvaluationResult {
        EvaluationResult {
            breaching_rows: Vec::new(),
            current_max: Some(2.0),
            highest_classification: Some(crate::alert::severity::StormLevel::Quiet),
            aurora_possible: false,
            skipped_rows: 0,
            threshold: 5.0,
            statistic: Statistic::Maximum,
        }
    }

    /// A fixed "now" used across the decision tests.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn state_fired_at(t: DateTime<Utc>) -> AlertState {
        AlertState {
            last_alert_time: Some(t),
            last_alert_max_kp: Some(6.0),
        }
    }

    // --- Pure decision ------------------------------------------------------

    #[test]
    fn test_no_breach_never_fires_regardless_of_state() {
        let armed = AlertState::default();
        let decision = decide(&quiet_evaluation(), fixed_now(), &armed, default_cooldown());
        assert!(!decision.should_fire);
        assert_eq!(decision.reason, FireReason::NoBreach);

        let cooling = state_fired_at(fixed_now() - Duration::hours(1));
        let decision = decide(&quiet_evaluation(), fixed_now(), &cooling, default_cooldown());
        assert_eq!(decision.reason, FireReason::NoBreach);
    }

    #[test]
    fn test_first_ever_run_is_armed_and_fires_on_breach() {
        let decision = decide(
            &breaching_evaluation(),
            fixed_now(),
            &AlertState::default(),
            default_cooldown(),
        );
        assert!(decision.should_fire);
        assert_eq!(decision.reason, FireReason::NewAlert);
    }

    #[test]
    fn test_breach_inside_cooldown_is_suppressed() {
        // Alert fired at t0; a breach at t0 + 5h59m must not fire.
        let state = state_fired_at(fixed_now() - Duration::minutes(5 * 60 + 59));
        let decision = decide(&breaching_evaluation(), fixed_now(), &state, default_cooldown());
        assert!(!decision.should_fire);
        assert_eq!(decision.reason, FireReason::Cooldown);
    }

    #[test]
    fn test_breach_after_cooldown_fires() {
        // A breach at t0 + 6h01m fires again.
        let state = state_fired_at(fixed_now() - Duration::minutes(6 * 60 + 1));
        let decision = decide(&breaching_evaluation(), fixed_now(), &state, default_cooldown());
        assert!(decision.should_fire);
        assert_eq!(decision.reason, FireReason::NewAlert);
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        // Elapsed == cooldown re-arms (the contract is >=, not >).
        let state = state_fired_at(fixed_now() - default_cooldown());
        let decision = decide(&breaching_evaluation(), fixed_now(), &state, default_cooldown());
        assert!(decision.should_fire, "elapsed exactly cooldown should fire");
    }

    #[test]
    fn test_decide_is_idempotent() {
        let state = state_fired_at(fixed_now() - Duration::hours(1));
        let first = decide(&breaching_evaluation(), fixed_now(), &state, default_cooldown());
        let second = decide(&breaching_evaluation(), fixed_now(), &state, default_cooldown());
        assert_eq!(first, second, "same inputs must yield the same decision");
    }

    // --- Persistence --------------------------------------------------------

    fn temp_store(name: &str) -> AlertStateStore {
        let mut path = std::env::temp_dir();
        path.push(format!("kpmon_test_{}_{}.json", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        AlertStateStore::new(path)
    }

    #[test]
    fn test_missing_state_file_loads_as_armed_default() {
        let store = temp_store("missing");
        assert_eq!(store.load(), AlertState::default());
    }

    #[test]
    fn test_state_round_trips_through_the_store() {
        let store = temp_store("round_trip");
        let state = state_fired_at(fixed_now());
        store.save(&state).expect("save should succeed");
        assert_eq!(store.load(), state);
        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn test_corrupt_state_file_falls_back_to_armed() {
        let store = temp_store("corrupt");
        std::fs::write(store.path(), "{ this is not json").unwrap();
        assert_eq!(store.load(), AlertState::default(), "corrupt file → armed");
        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn test_check_and_update_persists_on_new_alert() {
        let store = temp_store("persists");
        let decision =
            check_and_update(&store, &breaching_evaluation(), fixed_now(), default_cooldown());
        assert!(decision.should_fire);

        let persisted = store.load();
        assert_eq!(persisted.last_alert_time, Some(fixed_now()));
        assert_eq!(persisted.last_alert_max_kp, Some(6.33));
        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn test_check_and_update_does_not_touch_state_without_breach() {
        let store = temp_store("untouched");
        let decision =
            check_and_update(&store, &quiet_evaluation(), fixed_now(), default_cooldown());
        assert!(!decision.should_fire);
        assert!(!store.path().exists(), "no breach must not create a state file");
    }

    #[test]
    fn test_second_check_within_cooldown_is_suppressed() {
        let store = temp_store("cooldown_cycle");
        let first =
            check_and_update(&store, &breaching_evaluation(), fixed_now(), default_cooldown());
        assert!(first.should_fire);

        let one_hour_later = fixed_now() + Duration::hours(1);
        let second = check_and_update(
            &store,
            &breaching_evaluation(),
            one_hour_later,
            default_cooldown(),
        );
        assert!(!second.should_fire);
        assert_eq!(second.reason, FireReason::Cooldown);

        // State still carries the original alert time.
        assert_eq!(store.load().last_alert_time, Some(fixed_now()));
        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn test_corrupt_state_fires_and_rewrites_valid_state() {
        let store = temp_store("recover");
        std::fs::write(store.path(), "garbage bytes").unwrap();

        let decision =
            check_and_update(&store, &breaching_evaluation(), fixed_now(), default_cooldown());
        assert!(decision.should_fire, "unreadable state must fail armed");

        // The rewrite must be valid JSON the next load accepts.
        let persisted = store.load();
        assert_eq!(persisted.last_alert_time, Some(fixed_now()));
        let _ = std::fs::remove_file(store.path());
    }
}
