//! Prompt text sent to the text-generation capability.

/// Name of the coordinator agent seeded before planning.
pub const COORDINATOR_NAME: &str = "ProjectManagerBot";
/// Role of the coordinator agent.
pub const COORDINATOR_ROLE: &str = "Project Manager";
/// Specialties of the coordinator agent.
pub const COORDINATOR_SPECIALTIES: &[&str] = &["planning", "coordination"];
/// Identity used for swarm-level calls such as role determination.
pub const SWARM_IDENTITY: &str = "swarm";

/// Solo task execution.
pub fn task_prompt(agent_role: &str, description: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "As a {agent_role} specialist, how would you approach the task: {description}?"
    );
    append_context(&mut prompt, context);
    prompt
}

/// One member's contribution to a collaborative task.
pub fn collaborative_prompt(agent_role: &str, description: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "You are part of a collaborative group working on the task: {description}. \
         Contribute your perspective as a {agent_role} specialist."
    );
    append_context(&mut prompt, context);
    prompt
}

/// Ask for one new specialty from a list of completed tasks.
pub fn specialty_prompt(completed: &[String]) -> String {
    format!(
        "Based on these completed tasks: {completed:?}, suggest one new specialty for the agent. \
         Reply with the specialty name only."
    )
}

/// Ask which role the pool lacks most.
pub fn needed_role_prompt(current_roles: &[String], task_roles: &[String]) -> String {
    format!(
        "Given the current roles {current_roles:?} and required task roles {task_roles:?}, \
         what new role is most needed? Reply with the role name only."
    )
}

/// Knowledge an agent shares after completing work.
pub fn shareable_knowledge(agent: &str, specialties: &[String]) -> String {
    format!(
        "Shareable knowledge from {agent}: {}",
        specialties.join(", ")
    )
}

/// Knowledge recorded when a task is admitted.
pub fn new_task_note(description: &str) -> String {
    format!("New task: {description}")
}

fn append_context(prompt: &mut String, context: Option<&str>) {
    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("\n\nRelevant project knowledge:\n");
        prompt.push_str(context);
    }
}
