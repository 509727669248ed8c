use crate::types::{Task, TaskState};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use swarmer_core::{AdmissionError, DependencyFault, SwarmError, SwarmResult, TaskRecord};

/// Result of recording a dispatch failure against a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Failures recorded so far, including this one.
    pub attempts: u32,
    /// True when the retry ceiling was reached and the task is now `Failed`.
    pub terminal: bool,
}

#[derive(Clone, Copy)]
enum Mark {
    InProgress,
    Done,
}

/// The backlog plus the completed and failed logs.
///
/// Admission validates the dependency graph (unknown ids, self references,
/// cycles) so the backlog never holds a task that can stall forever.
#[derive(Debug, Default)]
pub struct TaskStore {
    backlog: HashMap<String, Task>,
    completed: Vec<Task>,
    completed_ids: HashSet<String>,
    failed: Vec<Task>,
    next_seq: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a single task.
    pub fn admit(&mut self, record: TaskRecord) -> SwarmResult<()> {
        self.admit_batch(vec![record]).map(|_| ())
    }

    /// Admit a whole plan atomically. Records may reference each other in any
    /// order; on any error nothing is admitted.
    pub fn admit_batch(&mut self, records: Vec<TaskRecord>) -> SwarmResult<usize> {
        let mut batch: Vec<Task> = Vec::with_capacity(records.len());
        let mut batch_ids: HashSet<String> = HashSet::new();

        for (offset, record) in records.into_iter().enumerate() {
            record.validate()?;
            let task = Task::from_record(record, self.next_seq + offset as u64);
            if self.contains(&task.id) || !batch_ids.insert(task.id.clone()) {
                return Err(AdmissionError::DuplicateId(task.id).into());
            }
            batch.push(task);
        }

        let failed_ids: HashSet<&str> = self.failed.iter().map(|t| t.id.as_str()).collect();
        for task in &batch {
            for dep in &task.dependencies {
                let fault = if *dep == task.id {
                    Some(DependencyFault::SelfReference)
                } else if failed_ids.contains(dep.as_str()) {
                    Some(DependencyFault::Failed)
                } else if !(self.backlog.contains_key(dep)
                    || self.completed_ids.contains(dep)
                    || batch_ids.contains(dep))
                {
                    Some(DependencyFault::Unknown)
                } else {
                    None
                };
                if let Some(fault) = fault {
                    return Err(AdmissionError::invalid_dependency(&task.id, dep, fault).into());
                }
            }
        }

        // Pending graph: backlog plus batch. Completed tasks have no pending
        // successors of their own, so they cannot be part of a cycle.
        let mut graph: HashMap<&str, &[String]> = self
            .backlog
            .values()
            .map(|t| (t.id.as_str(), t.dependencies.as_slice()))
            .collect();
        for task in &batch {
            graph.insert(task.id.as_str(), task.dependencies.as_slice());
        }
        let mut marks = HashMap::new();
        for task in &batch {
            let mut stack = Vec::new();
            if let Some(path) = dfs_cycle(task.id.as_str(), &graph, &mut marks, &mut stack) {
                let from = path.first().cloned().unwrap_or_default();
                let to = path.get(1).cloned().unwrap_or_default();
                return Err(
                    AdmissionError::invalid_dependency(from, to, DependencyFault::Cycle(path))
                        .into(),
                );
            }
        }

        let admitted = batch.len();
        self.next_seq += admitted as u64;
        for task in batch {
            tracing::info!(
                task_id = %task.id,
                role = %task.role,
                priority = task.base_priority,
                "Task admitted"
            );
            self.backlog.insert(task.id.clone(), task);
        }
        Ok(admitted)
    }

    /// Move a task to the completed log. Returns `Ok(false)` if it already
    /// completed (duplicate signal) or already failed terminally.
    pub fn complete(&mut self, id: &str, output: Option<String>) -> SwarmResult<bool> {
        if self.completed_ids.contains(id) || self.failed.iter().any(|t| t.id == id) {
            return Ok(false);
        }
        let mut task = self
            .backlog
            .remove(id)
            .ok_or_else(|| SwarmError::UnknownTask(id.to_string()))?;
        task.state = TaskState::Completed;
        task.completed_at = Some(Utc::now());
        task.output = output;
        self.completed_ids.insert(task.id.clone());
        self.completed.push(task);
        Ok(true)
    }

    /// Pending and every dependency is in the completed log.
    pub fn is_ready(&self, task: &Task) -> bool {
        task.is_pending() && task.dependencies.iter().all(|d| self.completed_ids.contains(d))
    }

    /// Ready tasks, most urgent first (lowest effective priority, then admission order).
    pub fn ready_tasks(&self) -> Vec<&Task> {
        let mut ready: Vec<&Task> = self.backlog.values().filter(|t| self.is_ready(t)).collect();
        ready.sort_by(|a, b| {
            a.effective_priority
                .total_cmp(&b.effective_priority)
                .then(a.seq.cmp(&b.seq))
        });
        ready
    }

    /// Dependencies of `task` not yet in the completed log.
    pub fn unmet_dependencies(&self, task: &Task) -> usize {
        task.dependencies
            .iter()
            .filter(|d| !self.completed_ids.contains(*d))
            .count()
    }

    /// Bind a ready task to its agents. Returns false if it is not ready.
    pub fn mark_assigned(&mut self, id: &str, agents: Vec<String>) -> bool {
        let ready = match self.backlog.get(id) {
            Some(task) => self.is_ready(task),
            None => false,
        };
        if !ready {
            return false;
        }
        if let Some(task) = self.backlog.get_mut(id) {
            task.state = TaskState::Assigned;
            task.assignees = agents;
        }
        true
    }

    /// Record a dispatch failure. The task reverts to Pending, or moves to the
    /// failed log once `max_retries` failures have accumulated.
    pub fn record_failure(
        &mut self,
        id: &str,
        reason: &str,
        max_retries: u32,
    ) -> SwarmResult<FailureOutcome> {
        let task = self
            .backlog
            .get_mut(id)
            .ok_or_else(|| SwarmError::UnknownTask(id.to_string()))?;
        task.failures += 1;
        task.assignees.clear();
        let attempts = task.failures;
        if attempts < max_retries {
            task.state = TaskState::Pending;
            return Ok(FailureOutcome {
                attempts,
                terminal: false,
            });
        }

        if let Some(mut task) = self.backlog.remove(id) {
            task.state = TaskState::Failed {
                reason: reason.to_string(),
            };
            self.failed.push(task);
        }
        Ok(FailureOutcome {
            attempts,
            terminal: true,
        })
    }

    /// Return every Assigned task to Pending, e.g. after a cancelled round.
    pub fn reset_in_flight(&mut self) -> Vec<String> {
        let mut reset: Vec<String> = Vec::new();
        for task in self.backlog.values_mut() {
            if task.state == TaskState::Assigned {
                task.state = TaskState::Pending;
                task.assignees.clear();
                reset.push(task.id.clone());
            }
        }
        reset.sort();
        reset
    }

    /// Visit every Pending task with its unmet dependency count.
    pub(crate) fn for_each_pending(&mut self, mut f: impl FnMut(&mut Task, usize)) {
        let completed = &self.completed_ids;
        for task in self.backlog.values_mut().filter(|t| t.is_pending()) {
            let unmet = task
                .dependencies
                .iter()
                .filter(|d| !completed.contains(*d))
                .count();
            f(task, unmet);
        }
    }

    /// Look a task up in the backlog, then the completed and failed logs.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.backlog
            .get(id)
            .or_else(|| self.completed.iter().find(|t| t.id == id))
            .or_else(|| self.failed.iter().find(|t| t.id == id))
    }

    /// Backlog tasks in admission order.
    pub fn backlog(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.backlog.values().collect();
        tasks.sort_by_key(|t| t.seq);
        tasks
    }

    /// Pending or Assigned tasks.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn pending_count(&self) -> usize {
        self.backlog.values().filter(|t| t.is_pending()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.backlog.is_empty()
    }

    /// Completed log, in completion order.
    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    /// Failed log, in failure order.
    pub fn failed(&self) -> &[Task] {
        &self.failed
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed_ids.contains(id)
    }

    fn contains(&self, id: &str) -> bool {
        self.backlog.contains_key(id)
            || self.completed_ids.contains(id)
            || self.failed.iter().any(|t| t.id == id)
    }

    /// Check for cycles among backlog tasks.
    pub fn has_cycle(&self) -> bool {
        let graph: HashMap<&str, &[String]> = self
            .backlog
            .values()
            .map(|t| (t.id.as_str(), t.dependencies.as_slice()))
            .collect();
        let mut marks = HashMap::new();
        graph.keys().any(|id| {
            let mut stack = Vec::new();
            dfs_cycle(*id, &graph, &mut marks, &mut stack).is_some()
        })
    }
}

/// Depth-first search for a back edge; returns the cycle path if found.
fn dfs_cycle<'a>(
    id: &'a str,
    graph: &HashMap<&'a str, &'a [String]>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    match marks.get(id) {
        Some(Mark::InProgress) => {
            let start = stack.iter().position(|s| *s == id)?;
            let mut path: Vec<String> = stack[start..].iter().map(|s| (*s).to_string()).collect();
            path.push(id.to_string());
            return Some(path);
        }
        Some(Mark::Done) => return None,
        None => {}
    }
    marks.insert(id, Mark::InProgress);
    stack.push(id);
    let deps: &'a [String] = graph.get(id).copied().unwrap_or(&[]);
    for dep in deps {
        if let Some(path) = dfs_cycle(dep.as_str(), graph, marks, stack) {
            return Some(path);
        }
    }
    stack.pop();
    marks.insert(id, Mark::Done);
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(id: &str, deps: &[&str]) -> TaskRecord {
        TaskRecord::new(id, format!("Do {id}"), "dev", 1).with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_empty_store() {
        let store = TaskStore::new();
        assert_eq!(store.backlog_len(), 0);
        assert!(store.is_empty());
        assert!(store.ready_tasks().is_empty());
        assert!(!store.has_cycle());
    }

    #[test]
    fn test_admit_and_get() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        assert_eq!(store.backlog_len(), 1);
        assert_eq!(store.get("T1").unwrap().description, "Do T1");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        let err = store.admit(record("T1", &[])).unwrap_err();
        assert!(matches!(
            err,
            SwarmError::Admission(AdmissionError::DuplicateId(ref id)) if id == "T1"
        ));
        assert_eq!(store.backlog_len(), 1);
    }

    #[test]
    fn test_duplicate_of_completed_rejected() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        store.complete("T1", None).unwrap();
        assert!(store.admit(record("T1", &[])).is_err());
    }

    #[test]
    fn test_unknown_dependency_leaves_backlog_unchanged() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        let err = store.admit(record("T2", &["Tx"])).unwrap_err();
        assert!(matches!(
            err,
            SwarmError::Admission(AdmissionError::InvalidDependency {
                fault: DependencyFault::Unknown,
                ref dependency,
                ..
            }) if dependency == "Tx"
        ));
        assert_eq!(store.backlog_len(), 1);
        assert!(store.get("T2").is_none());
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut store = TaskStore::new();
        let err = store.admit(record("T1", &["T1"])).unwrap_err();
        assert!(matches!(
            err,
            SwarmError::Admission(AdmissionError::InvalidDependency {
                fault: DependencyFault::SelfReference,
                ..
            })
        ));
    }

    #[test]
    fn test_batch_cycle_rejected_atomically() {
        let mut store = TaskStore::new();
        let err = store
            .admit_batch(vec![
                record("A", &["C"]),
                record("B", &["A"]),
                record("C", &["B"]),
                record("D", &[]),
            ])
            .unwrap_err();
        match err {
            SwarmError::Admission(AdmissionError::InvalidDependency {
                fault: DependencyFault::Cycle(path),
                ..
            }) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(store.is_empty());
        assert!(!store.has_cycle());
    }

    #[test]
    fn test_batch_forward_references_allowed() {
        let mut store = TaskStore::new();
        let n = store
            .admit_batch(vec![record("T2", &["T1"]), record("T1", &[])])
            .unwrap();
        assert_eq!(n, 2);
        let ready: Vec<&str> = store.ready_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ready, vec!["T1"]);
    }

    #[test]
    fn test_batch_duplicate_within_batch() {
        let mut store = TaskStore::new();
        assert!(store
            .admit_batch(vec![record("T1", &[]), record("T1", &[])])
            .is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_record_rejected() {
        let mut store = TaskStore::new();
        let err = store.admit(TaskRecord::new("T1", "", "dev", 1)).unwrap_err();
        assert!(matches!(
            err,
            SwarmError::Admission(AdmissionError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_ready_requires_completed_dependencies() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        store.admit(record("T2", &["T1"])).unwrap();
        assert_eq!(store.ready_tasks().len(), 1);

        assert!(store.complete("T1", Some("done".into())).unwrap());
        let ready: Vec<&str> = store.ready_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ready, vec!["T2"]);
        assert_eq!(store.completed()[0].output.as_deref(), Some("done"));
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        assert!(store.complete("T1", None).unwrap());
        assert!(!store.complete("T1", None).unwrap());
        assert_eq!(store.completed().len(), 1);
        assert!(store.is_completed("T1"));
    }

    #[test]
    fn test_complete_unknown_task_errors() {
        let mut store = TaskStore::new();
        assert!(matches!(
            store.complete("nope", None),
            Err(SwarmError::UnknownTask(_))
        ));
    }

    #[test]
    fn test_mark_assigned_requires_ready() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        store.admit(record("T2", &["T1"])).unwrap();
        assert!(!store.mark_assigned("T2", vec!["a".into()]));
        assert!(store.mark_assigned("T1", vec!["a".into()]));
        assert_eq!(store.get("T1").unwrap().state, TaskState::Assigned);
        // Assigned tasks are no longer ready.
        assert!(store.ready_tasks().is_empty());
    }

    #[test]
    fn test_failures_reach_terminal_state() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();

        for attempt in 1..=2 {
            store.mark_assigned("T1", vec!["a".into()]);
            let outcome = store.record_failure("T1", "boom", 3).unwrap();
            assert_eq!(outcome.attempts, attempt);
            assert!(!outcome.terminal);
            assert_eq!(store.get("T1").unwrap().state, TaskState::Pending);
        }

        store.mark_assigned("T1", vec!["a".into()]);
        let outcome = store.record_failure("T1", "boom", 3).unwrap();
        assert!(outcome.terminal);
        assert!(store.is_empty());
        assert_eq!(store.failed().len(), 1);
        assert!(matches!(
            store.get("T1").unwrap().state,
            TaskState::Failed { ref reason } if reason == "boom"
        ));
    }

    #[test]
    fn test_dependency_on_failed_task_rejected() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        store.record_failure("T1", "boom", 1).unwrap();
        let err = store.admit(record("T2", &["T1"])).unwrap_err();
        assert!(matches!(
            err,
            SwarmError::Admission(AdmissionError::InvalidDependency {
                fault: DependencyFault::Failed,
                ..
            })
        ));
    }

    #[test]
    fn test_reset_in_flight() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        store.admit(record("T2", &[])).unwrap();
        store.mark_assigned("T2", vec!["a".into()]);
        assert_eq!(store.reset_in_flight(), vec!["T2".to_string()]);
        assert_eq!(store.ready_tasks().len(), 2);
        assert!(store.get("T2").unwrap().assignees.is_empty());
    }

    #[test]
    fn test_ready_order_priority_then_admission() {
        let mut store = TaskStore::new();
        store.admit(TaskRecord::new("low", "x", "dev", 3)).unwrap();
        store.admit(TaskRecord::new("a", "x", "dev", 1)).unwrap();
        store.admit(TaskRecord::new("b", "x", "dev", 1)).unwrap();
        let ids: Vec<&str> = store.ready_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "low"]);
    }

    #[test]
    fn test_unmet_dependencies_count() {
        let mut store = TaskStore::new();
        store.admit(record("T1", &[])).unwrap();
        store.admit(record("T2", &[])).unwrap();
        store.admit(record("T3", &["T1", "T2"])).unwrap();
        store.complete("T1", None).unwrap();
        let t3 = store.get("T3").unwrap();
        assert_eq!(store.unmet_dependencies(t3), 1);
    }
}
