//! Resume Evaluator: scores one resume against a criteria list.
//!
//! The LLM is asked for `Criterion: Score` lines followed by `Justification:` lines.
//! Parsing is loose and line-based:
//!
//! 1. The FIRST line containing the criterion label and a `:` is the score line.
//! 2. The first ASCII digit run between the first and second `:` on that line
//!    is the score, clamped to 0..=10. Digits after a second colon are ignored.
//! 3. A criterion with no score line, or no digits on it, scores 0.
//!
//! First-match wins even when a later line would be a better fit.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::llm_client::TextGenerator;
use crate::screening::models::{ResumeEvaluation, ScoreMap, MAX_CRITERION_SCORE};
use crate::screening::outcome::Outcome;
use crate::screening::prompts::{render, truncate_for_prompt, EVALUATION_PROMPT_TEMPLATE};

/// Resume text beyond this many characters is cut before prompting.
pub const MAX_RESUME_CHARS: usize = 4000;

/// Score given to every criterion when the evaluation call fails.
pub const FALLBACK_SCORE: u8 = 5;

pub const FALLBACK_JUSTIFICATION: &str = "Unable to evaluate due to API error.";

const JUSTIFICATION_PREFIX: &str = "justification:";

fn digit_run() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("static regex is valid"))
}

/// Builds the evaluation prompt, truncating the resume to `MAX_RESUME_CHARS`.
pub fn build_evaluation_prompt(
    job_description: &str,
    criteria: &[String],
    resume_text: &str,
) -> String {
    let resume = truncate_for_prompt(resume_text, MAX_RESUME_CHARS);
    let criteria_list = criteria.join(", ");
    render(
        EVALUATION_PROMPT_TEMPLATE,
        &[
            ("job_description", job_description),
            ("resume_text", resume.as_ref()),
            ("criteria", criteria_list.as_str()),
        ],
    )
}

/// One evaluation call. Never fails: a transport error degrades to
/// `FALLBACK_SCORE` for every criterion. The fallback always replaces the
/// whole map; partial replies are never merged into it.
pub async fn evaluate_resume(
    llm: &dyn TextGenerator,
    job_description: &str,
    criteria: &[String],
    resume_text: &str,
) -> Outcome<ResumeEvaluation> {
    let prompt = build_evaluation_prompt(job_description, criteria, resume_text);

    match llm.generate(&prompt).await {
        Ok(reply) => {
            let evaluation = ResumeEvaluation {
                scores: parse_scores(&reply, criteria),
                justifications: parse_justifications(&reply, criteria),
            };
            debug!(
                "Evaluated resume: {} criteria, {} reply chars",
                criteria.len(),
                reply.len()
            );
            Outcome::Success(evaluation)
        }
        Err(e) => {
            warn!("Resume evaluation failed, using fallback scores: {e}");
            Outcome::Degraded(fallback_evaluation(criteria))
        }
    }
}

pub fn fallback_evaluation(criteria: &[String]) -> ResumeEvaluation {
    ResumeEvaluation {
        scores: criteria
            .iter()
            .map(|c| (c.clone(), FALLBACK_SCORE))
            .collect(),
        justifications: criteria
            .iter()
            .map(|c| (c.clone(), FALLBACK_JUSTIFICATION.to_string()))
            .collect(),
    }
}

/// Scores every criterion independently against the reply.
pub fn parse_scores(reply: &str, criteria: &[String]) -> ScoreMap {
    let lines: Vec<&str> = reply.split('\n').collect();
    criteria
        .iter()
        .map(|criterion| {
            let score = find_score_line(&lines, criterion)
                .and_then(|idx| score_from_line(lines[idx]))
                .unwrap_or(0);
            (criterion.clone(), score)
        })
        .collect()
}

/// Pulls the text of a `Justification:` line directly following each
/// criterion's score line, skipping blank lines. Missing ones map to "".
pub fn parse_justifications(reply: &str, criteria: &[String]) -> BTreeMap<String, String> {
    let lines: Vec<&str> = reply.split('\n').collect();
    criteria
        .iter()
        .map(|criterion| {
            let justification = find_score_line(&lines, criterion)
                .and_then(|idx| {
                    lines[idx + 1..]
                        .iter()
                        .map(|l| l.trim())
                        .find(|l| !l.is_empty())
                })
                .and_then(strip_justification_prefix)
                .unwrap_or_default();
            (criterion.clone(), justification)
        })
        .collect()
}

fn find_score_line(lines: &[&str], criterion: &str) -> Option<usize> {
    lines
        .iter()
        .position(|line| line.contains(criterion) && line.contains(':'))
}

/// First digit run in the segment between the first and second colon, clamped.
/// Runs too long for a u64 are far above the scale and clamp to the maximum.
fn score_from_line(line: &str) -> Option<u8> {
    let segment = line.split(':').nth(1)?;
    let digits = digit_run().find(segment)?;
    let value = digits.as_str().parse::<u64>().unwrap_or(u64::MAX);
    Some(value.min(MAX_CRITERION_SCORE as u64) as u8)
}

fn strip_justification_prefix(line: &str) -> Option<String> {
    let head = line.get(..JUSTIFICATION_PREFIX.len())?;
    if head.eq_ignore_ascii_case(JUSTIFICATION_PREFIX) {
        Some(line[JUSTIFICATION_PREFIX.len()..].trim().to_string())
    } else {
        None
    }
}
