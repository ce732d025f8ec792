//! Candidate feedback: free-text strengths, gaps and overall fit from the LLM.

use tracing::warn;

use crate::llm_client::TextGenerator;
use crate::screening::models::ScoreMap;
use crate::screening::outcome::Outcome;
use crate::screening::prompts::{render, truncate_for_prompt, FEEDBACK_PROMPT_TEMPLATE};

/// Both the job description and the resume are cut to this many characters.
pub const MAX_FEEDBACK_INPUT_CHARS: usize = 2000;

pub const FALLBACK_FEEDBACK: &str = "Unable to generate feedback at this time.";

pub fn build_feedback_prompt(job_description: &str, resume_text: &str, scores: &ScoreMap) -> String {
    let job_description = truncate_for_prompt(job_description, MAX_FEEDBACK_INPUT_CHARS);
    let resume_text = truncate_for_prompt(resume_text, MAX_FEEDBACK_INPUT_CHARS);
    let scores_text = scores
        .iter()
        .map(|(criterion, score)| format!("{criterion}: {score}/10"))
        .collect::<Vec<_>>()
        .join("\n");

    render(
        FEEDBACK_PROMPT_TEMPLATE,
        &[
            ("job_description", job_description.as_ref()),
            ("resume_text", resume_text.as_ref()),
            ("scores", scores_text.as_str()),
        ],
    )
}

/// Returns the reply verbatim. A failed call or a blank reply degrades to
/// `FALLBACK_FEEDBACK`.
pub async fn generate_feedback(
    llm: &dyn TextGenerator,
    job_description: &str,
    resume_text: &str,
    scores: &ScoreMap,
) -> Outcome<String> {
    let prompt = build_feedback_prompt(job_description, resume_text, scores);

    match llm.generate(&prompt).await {
        Ok(reply) if !reply.trim().is_empty() => Outcome::Success(reply),
        Ok(_) => {
            warn!("Feedback reply was empty");
            Outcome::Degraded(FALLBACK_FEEDBACK.to_string())
        }
        Err(e) => {
            warn!("Feedback generation failed: {e}");
            Outcome::Degraded(FALLBACK_FEEDBACK.to_string())
        }
    }
}
