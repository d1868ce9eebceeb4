//! CPU utilization derived from successive executor samples
//!
//! Mesos reports cumulative CPU seconds per executor. Utilization needs two
//! samples, so the tracker keeps the previous pass per executor ID.
//!
//! # Known limitation
//!
//! An executor restart resets its counters. The resulting negative delta is
//! detected and the value suppressed for that pass; a restart between two
//! polls that lands above the old counter value is indistinguishable from
//! normal growth.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::debug;

use crate::catalog::CatalogPaths;
use crate::collector::{Entity, StatValue};

/// Derived statistic name, exposed alongside the executor's own statistics
pub const CPU_UTILIZATION_METRIC: &str = "cpus_util_pct";

/// Converts (seconds / nanoseconds) to a percentage: 1e9 ns/s times 100
pub const UTILIZATION_SCALE: f64 = 1e11;

const CPUS_LIMIT: &str = "cpus_limit";
const CPUS_SYSTEM_TIME: &str = "cpus_system_time_secs";
const CPUS_USER_TIME: &str = "cpus_user_time_secs";

/// The three statistics the rate needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    pub cpus_limit: f64,
    pub system_secs: f64,
    pub user_secs: f64,
}

impl CpuSample {
    /// Read the sample from an executor's statistics; `None` if any field is
    /// missing
    pub fn from_statistics(statistics: &StatValue) -> Option<Self> {
        Some(Self {
            cpus_limit: statistics.lookup(&[CPUS_LIMIT])?,
            system_secs: statistics.lookup(&[CPUS_SYSTEM_TIME])?,
            user_secs: statistics.lookup(&[CPUS_USER_TIME])?,
        })
    }
}

/// Utilization percentage between two samples `elapsed` apart
///
/// `1e11 * (Δsystem + Δuser) / (cpus_limit * Δwall_nanos)`. Returns `None`
/// for counter resets, a non-positive limit or a zero interval.
pub fn derive_utilization(prior: &CpuSample, current: &CpuSample, elapsed: Duration) -> Option<f64> {
    let system = current.system_secs - prior.system_secs;
    let user = current.user_secs - prior.user_secs;
    if system < 0.0 || user < 0.0 {
        return None;
    }

    let wall_nanos = elapsed.as_nanos() as f64;
    if current.cpus_limit <= 0.0 || wall_nanos <= 0.0 {
        return None;
    }

    Some(UTILIZATION_SCALE * (system + user) / (current.cpus_limit * wall_nanos))
}

/// Previous collection pass
#[derive(Debug, Default)]
pub struct PriorSampleState {
    timestamp: Option<SystemTime>,
    samples: HashMap<String, CpuSample>,
}

/// Owner of the prior sample state
///
/// Collection calls may run concurrently, so the state sits behind a mutex;
/// it is never held across an await point.
#[derive(Debug, Default)]
pub struct RateTracker {
    state: Mutex<PriorSampleState>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive utilization for every executor seen in the previous pass, then
    /// replace the stored state with this pass
    pub fn observe(&self, timestamp: SystemTime, executors: &[Entity]) -> HashMap<String, f64> {
        let current: HashMap<String, CpuSample> = executors
            .iter()
            .filter_map(|e| CpuSample::from_statistics(&e.statistics).map(|s| (e.id.clone(), s)))
            .collect();

        let mut state = self.state.lock().expect("Mutex poisoned");
        let mut derived = HashMap::new();

        match state.timestamp.map(|prior| timestamp.duration_since(prior)) {
            None => debug!("First sample, no utilization yet"),
            Some(Err(_)) => debug!("Clock moved backwards, skipping utilization"),
            Some(Ok(elapsed)) => {
                for (id, sample) in &current {
                    let Some(prior) = state.samples.get(id) else {
                        continue;
                    };
                    match derive_utilization(prior, sample, elapsed) {
                        Some(value) => {
                            derived.insert(id.clone(), value);
                        }
                        None => debug!(executor = %id, "Utilization suppressed"),
                    }
                }
            }
        }

        *state = PriorSampleState {
            timestamp: Some(timestamp),
            samples: current,
        };

        derived
    }

    /// [`observe`](Self::observe) and store each result in the executor's
    /// statistics under [`CPU_UTILIZATION_METRIC`]
    pub fn apply(&self, timestamp: SystemTime, executors: &mut [Entity]) {
        let derived = self.observe(timestamp, executors);
        for executor in executors.iter_mut() {
            if let Some(value) = derived.get(&executor.id) {
                executor.statistics.insert(CPU_UTILIZATION_METRIC, *value);
            }
        }
    }

    /// Whether a previous pass has been recorded
    pub fn has_history(&self) -> bool {
        self.state.lock().expect("Mutex poisoned").timestamp.is_some()
    }
}

/// Advertise the derived metric when its inputs are in the catalog
pub fn advertise_derived(paths: &mut CatalogPaths) {
    if [CPUS_LIMIT, CPUS_SYSTEM_TIME, CPUS_USER_TIME]
        .iter()
        .all(|p| paths.contains(p))
    {
        paths.insert(CPU_UTILIZATION_METRIC);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::UNIX_EPOCH;

    fn executor(id: &str, limit: f64, system: f64, user: f64) -> Entity {
        Entity {
            id: id.to_string(),
            parent_id: Some("fw-1".to_string()),
            name: id.to_string(),
            source: id.to_string(),
            statistics: StatValue::from_json(serde_json::json!({
                "cpus_limit": limit,
                "cpus_system_time_secs": system,
                "cpus_user_time_secs": user,
            }))
            .unwrap(),
        }
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_derive_utilization_formula() {
        let prior = CpuSample {
            cpus_limit: 1.0,
            system_secs: 1.5,
            user_secs: 3.0,
        };
        let current = CpuSample {
            cpus_limit: 1.0,
            system_secs: 2.5,
            user_secs: 4.0,
        };

        assert_eq!(
            derive_utilization(&prior, &current, Duration::from_secs(10)),
            Some(20.0)
        );
    }

    #[test]
    fn test_derive_utilization_suppresses_reset() {
        let prior = CpuSample {
            cpus_limit: 1.0,
            system_secs: 100.0,
            user_secs: 100.0,
        };
        let current = CpuSample {
            cpus_limit: 1.0,
            system_secs: 1.0,
            user_secs: 150.0,
        };
        assert_eq!(derive_utilization(&prior, &current, Duration::from_secs(10)), None);
    }

    #[test]
    fn test_derive_utilization_rejects_degenerate_inputs() {
        let sample = CpuSample {
            cpus_limit: 0.0,
            system_secs: 1.0,
            user_secs: 1.0,
        };
        assert_eq!(derive_utilization(&sample, &sample, Duration::from_secs(10)), None);

        let sample = CpuSample {
            cpus_limit: 1.0,
            ..sample
        };
        assert_eq!(derive_utilization(&sample, &sample, Duration::ZERO), None);
    }

    #[test]
    fn test_first_pass_yields_nothing() {
        let tracker = RateTracker::new();
        assert!(!tracker.has_history());

        let derived = tracker.observe(at(100), &[executor("e1", 1.0, 1.5, 3.0)]);
        assert!(derived.is_empty());
        assert!(tracker.has_history());
    }

    #[test]
    fn test_second_pass_matches_formula() {
        let tracker = RateTracker::new();
        tracker.observe(at(100), &[executor("e1", 1.0, 1.5, 3.0)]);

        let derived = tracker.observe(at(110), &[executor("e1", 1.0, 2.5, 4.0)]);
        assert_eq!(derived.get("e1"), Some(&20.0));
    }

    #[test]
    fn test_keyed_by_executor_not_position() {
        let tracker = RateTracker::new();
        tracker.observe(
            at(100),
            &[executor("e1", 1.0, 0.0, 0.0), executor("e2", 2.0, 0.0, 0.0)],
        );

        // Order swapped and a new executor added.
        let derived = tracker.observe(
            at(110),
            &[
                executor("e3", 1.0, 5.0, 5.0),
                executor("e2", 2.0, 2.0, 2.0),
                executor("e1", 1.0, 1.0, 1.0),
            ],
        );

        assert_eq!(derived.len(), 2);
        assert_eq!(derived.get("e1"), Some(&20.0));
        assert_eq!(derived.get("e2"), Some(&20.0));
        assert!(!derived.contains_key("e3"));
    }

    #[test]
    fn test_state_replaced_wholesale() {
        let tracker = RateTracker::new();
        tracker.observe(at(100), &[executor("e1", 1.0, 0.0, 0.0)]);
        tracker.observe(at(110), &[executor("e2", 1.0, 0.0, 0.0)]);

        // e1 vanished from the previous pass, so it has no history now.
        let derived = tracker.observe(at(120), &[executor("e1", 1.0, 1.0, 1.0)]);
        assert!(derived.is_empty());
    }

    #[test]
    fn test_clock_moving_backwards_skips_pass() {
        let tracker = RateTracker::new();
        tracker.observe(at(110), &[executor("e1", 1.0, 0.0, 0.0)]);

        let derived = tracker.observe(at(100), &[executor("e1", 1.0, 1.0, 1.0)]);
        assert!(derived.is_empty());

        // The skipped pass is still the new baseline.
        let derived = tracker.observe(at(110), &[executor("e1", 1.0, 2.0, 2.0)]);
        assert_eq!(derived.get("e1"), Some(&20.0));
    }

    #[test]
    fn test_concurrent_observe() {
        let tracker = Arc::new(RateTracker::new());
        let handles: Vec<_> = (0..8u64)
            .map(|worker| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    let mut values = Vec::new();
                    for i in 0..200u64 {
                        let secs = i as f64 * (worker + 1) as f64;
                        let executors = [
                            executor("e1", 1.0, secs, secs),
                            executor(&format!("w{}", worker), 2.0, secs, 0.0),
                        ];
                        let derived = tracker.observe(at(1000 + i * 8 + worker), &executors);
                        values.extend(derived.into_values());
                    }
                    values
                })
            })
            .collect();

        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(value.is_finite() && value >= 0.0, "bad utilization {}", value);
            }
        }
        assert!(tracker.has_history());
    }

    #[test]
    fn test_apply_injects_statistic() {
        let tracker = RateTracker::new();
        let mut first = vec![executor("e1", 1.0, 1.5, 3.0)];
        tracker.apply(at(100), &mut first);
        assert_eq!(first[0].statistics.lookup(&[CPU_UTILIZATION_METRIC]), None);

        let mut second = vec![executor("e1", 1.0, 2.5, 4.0)];
        tracker.apply(at(110), &mut second);
        assert_eq!(
            second[0].statistics.lookup(&[CPU_UTILIZATION_METRIC]),
            Some(20.0)
        );
    }

    #[test]
    fn test_advertise_derived() {
        let mut paths = CatalogPaths::new();
        paths.insert(CPUS_LIMIT);
        paths.insert(CPUS_SYSTEM_TIME);
        advertise_derived(&mut paths);
        assert!(!paths.contains(CPU_UTILIZATION_METRIC));

        paths.insert(CPUS_USER_TIME);
        advertise_derived(&mut paths);
        assert!(paths.contains(CPU_UTILIZATION_METRIC));
    }
}
