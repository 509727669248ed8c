use swarmer_orchestrator::{DeferReason, PoolAction, RoundReport, Scheduler};

const PREVIEW_CHARS: usize = 200;

/// Human-readable round summary for stdout.
pub fn render_round(report: &RoundReport) -> String {
    if report.done {
        return format!("Round {}: backlog empty, all work finished.", report.round);
    }
    let mut out = format!(
        "Round {}: {} assigned, {} completed, {} failed, {} deferred, {} remaining",
        report.round,
        report.assigned.len(),
        report.completed.len(),
        report.failures.len(),
        report.deferred.len(),
        report.backlog_remaining
    );
    for assignment in &report.assigned {
        let mark = if report.completed.contains(&assignment.task_id) {
            "done"
        } else {
            "failed"
        };
        out.push_str(&format!(
            "\n  {} [{}] -> {} ({mark})",
            assignment.task_id,
            assignment.role,
            assignment.agents.join(", ")
        ));
    }
    for failure in &report.failures {
        let kind = if failure.terminal { "gave up" } else { "will retry" };
        out.push_str(&format!(
            "\n  ! {} attempt {} {kind}: {}",
            failure.task_id, failure.attempt, failure.message
        ));
    }
    for deferral in &report.deferred {
        let why = match &deferral.reason {
            DeferReason::NoEligibleAgent => "no eligible agent".to_string(),
            DeferReason::InsufficientCollaborators {
                available,
                required,
            } => format!("{available} of {required} collaborators free"),
        };
        out.push_str(&format!("\n  ~ {} waiting: {why}", deferral.task_id));
    }
    for gain in &report.specialties_gained {
        out.push_str(&format!("\n  + {} learned {}", gain.agent, gain.specialty));
    }
    match &report.pool_action {
        PoolAction::Grew { agent, role } => {
            out.push_str(&format!("\n  pool: added {agent} as {role}"));
        }
        PoolAction::Shrank { agent } => out.push_str(&format!("\n  pool: retired {agent}")),
        PoolAction::GrowthSkipped { reason } => {
            out.push_str(&format!("\n  pool: growth skipped ({reason})"));
        }
        PoolAction::Held => {}
    }
    out
}

/// Final task and agent tallies.
pub fn render_summary(scheduler: &Scheduler) -> String {
    let store = scheduler.store();
    let mut out = format!(
        "Completed {} task(s), {} failed, {} left in backlog.",
        store.completed().len(),
        store.failed().len(),
        store.backlog_len()
    );
    for task in store.failed() {
        out.push_str(&format!("\n  failed: {} ({})", task.id, task.description));
    }
    out.push_str("\nAgents:");
    for agent in scheduler.registry().agents() {
        out.push_str(&format!(
            "\n  {} ({}) completed {}; specialties: {}",
            agent.id,
            agent.role,
            agent.completed_count,
            agent.specialties.join(", ")
        ));
    }
    out
}

/// First `PREVIEW_CHARS` characters of an artifact.
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
