//! Criteria Extractor: turns a job description into a short, ordered list of
//! evaluation labels by asking the LLM for one label per line.

use tracing::{debug, warn};

use crate::llm_client::TextGenerator;
use crate::screening::outcome::Outcome;
use crate::screening::prompts::{render, CRITERIA_PROMPT_TEMPLATE};

/// Labels kept from a single reply.
pub const MAX_CRITERIA: usize = 8;

/// Lines this long or longer read as prose, not labels.
pub const MAX_CRITERION_LEN: usize = 50;

/// Used whenever the LLM cannot supply usable criteria.
pub const FALLBACK_CRITERIA: [&str; 5] = [
    "Technical Skills",
    "Experience",
    "Education",
    "Communication Skills",
    "Problem Solving",
];

pub fn fallback_criteria() -> Vec<String> {
    FALLBACK_CRITERIA.iter().map(|c| c.to_string()).collect()
}

/// Asks the LLM for criteria. Never fails: a transport error, or a reply with
/// no usable lines, degrades to `FALLBACK_CRITERIA`.
pub async fn extract_criteria(
    llm: &dyn TextGenerator,
    job_description: &str,
) -> Outcome<Vec<String>> {
    let prompt = render(
        CRITERIA_PROMPT_TEMPLATE,
        &[("job_description", job_description)],
    );

    let reply = match llm.generate(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Criteria extraction failed, using fallback criteria: {e}");
            return Outcome::Degraded(fallback_criteria());
        }
    };

    let criteria = parse_criteria(&reply);
    if criteria.is_empty() {
        warn!(
            "Criteria reply had no usable labels ({} chars), using fallback criteria",
            reply.len()
        );
        return Outcome::Degraded(fallback_criteria());
    }

    debug!("Extracted {} criteria", criteria.len());
    Outcome::Success(criteria)
}

/// Keeps trimmed lines that look like labels: non-empty, shorter than
/// `MAX_CRITERION_LEN` characters, no `.`. At most `MAX_CRITERIA`, in reply order.
pub fn parse_criteria(reply: &str) -> Vec<String> {
    reply
        .split('\n')
        .map(str::trim)
        .filter(|line| is_label(line))
        .take(MAX_CRITERIA)
        .map(str::to_string)
        .collect()
}

fn is_label(line: &str) -> bool {
    !line.is_empty() && line.chars().count() < MAX_CRITERION_LEN && !line.contains('.')
}
