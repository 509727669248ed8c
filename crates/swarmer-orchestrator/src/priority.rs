use crate::task_store::TaskStore;
use serde::{Deserialize, Serialize};

/// Coefficients of the effective-priority formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Added per round waited.
    pub wait_bonus: f64,
    /// Subtracted per unmet dependency.
    pub dependency_penalty: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            wait_bonus: 0.1,
            dependency_penalty: 0.05,
        }
    }
}

/// `base + wait_bonus * rounds_waited - dependency_penalty * unmet`.
///
/// Lower values are scheduled first.
pub fn effective_priority(
    weights: &PriorityWeights,
    base_priority: u32,
    rounds_waited: u32,
    unmet_dependencies: usize,
) -> f64 {
    f64::from(base_priority) + weights.wait_bonus * f64::from(rounds_waited)
        - weights.dependency_penalty * unmet_dependencies as f64
}

/// Recomputes effective priorities each round and ages tasks left waiting.
#[derive(Debug, Clone, Default)]
pub struct PriorityEngine {
    weights: PriorityWeights,
}

impl PriorityEngine {
    pub fn new(weights: PriorityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &PriorityWeights {
        &self.weights
    }

    /// Recompute `effective_priority` for every Pending task from its base
    /// priority. Returns the number of tasks updated.
    pub fn reprioritize(&self, store: &mut TaskStore) -> usize {
        let mut updated = 0;
        store.for_each_pending(|task, unmet| {
            task.effective_priority =
                effective_priority(&self.weights, task.base_priority, task.rounds_waited, unmet);
            tracing::debug!(
                task_id = %task.id,
                effective = task.effective_priority,
                rounds_waited = task.rounds_waited,
                unmet,
                "Priority recomputed"
            );
            updated += 1;
        });
        updated
    }

    /// Count one more round waited for every task still Pending.
    pub fn age(&self, store: &mut TaskStore) {
        store.for_each_pending(|task, _| {
            task.rounds_waited = task.rounds_waited.saturating_add(1);
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use swarmer_core::TaskRecord;

    #[test]
    fn test_formula() {
        let w = PriorityWeights::default();
        let p = effective_priority(&w, 2, 3, 2);
        assert!((p - (2.0 + 0.3 - 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_non_decreasing_in_rounds_waited() {
        let w = PriorityWeights::default();
        for base in 1..=5 {
            for unmet in 0..4 {
                let mut prev = effective_priority(&w, base, 0, unmet);
                for rounds in 1..200 {
                    let next = effective_priority(&w, base, rounds, unmet);
                    assert!(next > prev, "base={base} unmet={unmet} rounds={rounds}");
                    prev = next;
                }
            }
        }
    }

    #[test]
    fn test_reprioritize_starts_from_base_each_round() {
        let mut store = TaskStore::new();
        store.admit(TaskRecord::new("T1", "x", "dev", 2)).unwrap();
        store
            .admit(TaskRecord::new("T2", "y", "dev", 2).with_dependencies(["T1"]))
            .unwrap();
        let engine = PriorityEngine::default();

        engine.reprioritize(&mut store);
        engine.reprioritize(&mut store);
        let t1 = store.get("T1").unwrap().effective_priority;
        let t2 = store.get("T2").unwrap().effective_priority;
        assert!((t1 - 2.0).abs() < 1e-9);
        assert!((t2 - 1.95).abs() < 1e-9);

        engine.age(&mut store);
        engine.reprioritize(&mut store);
        let t1 = store.get("T1").unwrap().effective_priority;
        assert!((t1 - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_age_skips_assigned_tasks() {
        let mut store = TaskStore::new();
        store.admit(TaskRecord::new("T1", "x", "dev", 1)).unwrap();
        store.admit(TaskRecord::new("T2", "y", "dev", 1)).unwrap();
        store.mark_assigned("T1", vec!["a".into()]);
        PriorityEngine::default().age(&mut store);
        assert_eq!(store.get("T1").unwrap().rounds_waited, 0);
        assert_eq!(store.get("T2").unwrap().rounds_waited, 1);
    }
}
