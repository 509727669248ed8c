use crate::prompts;
use crate::registry::AgentRegistry;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use swarmer_core::TextGenerator;

const MAX_SPECIALTY_LEN: usize = 64;

/// A specialty an agent picked up after a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialtyGain {
    pub agent: String,
    pub specialty: String,
}

/// Ask for a new specialty for each agent in `agent_ids`, concurrently.
///
/// Best effort: generation errors and unusable replies are logged and
/// skipped. Returns the specialties actually added.
pub async fn evolve_specialties(
    generator: &dyn TextGenerator,
    registry: &mut AgentRegistry,
    agent_ids: &[String],
) -> Vec<SpecialtyGain> {
    let requests: Vec<(String, String)> = agent_ids
        .iter()
        .filter_map(|id| registry.get(id))
        .filter(|agent| !agent.completed_descriptions.is_empty())
        .map(|agent| {
            (
                agent.id.clone(),
                prompts::specialty_prompt(&agent.completed_descriptions),
            )
        })
        .collect();

    let replies = join_all(
        requests
            .iter()
            .map(|(id, prompt)| generator.generate(id, prompt)),
    )
    .await;

    let mut gains = Vec::new();
    for ((agent, _), reply) in requests.into_iter().zip(replies) {
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(agent = %agent, error = %e, "Specialty suggestion failed");
                continue;
            }
        };
        let Some(specialty) = parse_specialty(&reply) else {
            tracing::debug!(agent = %agent, "Empty specialty suggestion");
            continue;
        };
        match registry.add_specialty(&agent, &specialty) {
            Ok(true) => {
                tracing::info!(agent = %agent, specialty = %specialty, "Agent gained specialty");
                gains.push(SpecialtyGain { agent, specialty });
            }
            Ok(false) => {}
            // Agent left the pool while the call was in flight.
            Err(e) => tracing::warn!(agent = %agent, error = %e, "Specialty not applied"),
        }
    }
    gains
}

/// First non-empty line, without list markers or quotes, capped in length.
pub fn parse_specialty(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_start_matches(['-', '*', '#']).trim_start();
    // Numbered list marker such as "1." or "2)".
    let line = match line.split_once(['.', ')']) {
        Some((n, rest)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => rest.trim(),
        _ => line,
    };
    let line = line
        .strip_prefix("Specialty:")
        .or_else(|| line.strip_prefix("specialty:"))
        .unwrap_or(line);
    let cleaned = line
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*' || c == '.')
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().take(MAX_SPECIALTY_LEN).collect())
}
