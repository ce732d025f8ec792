//! Batch screening: one evaluation call per candidate, run concurrently.
//!
//! Flow per candidate: evaluate_resume → calculate_overall_score → (optional) feedback.
//! Calls are bounded by a shared semaphore. Results come back in submission order,
//! then `rank_candidates` orders them for display.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::TextGenerator;
use crate::screening::aggregate::{calculate_overall_score, rank_candidates};
use crate::screening::evaluator::evaluate_resume;
use crate::screening::feedback::generate_feedback;
use crate::screening::models::{CandidateResult, CandidateResume, WeightMap};
use crate::screening::outcome::OutcomeStatus;

/// Inputs shared by every candidate of a batch.
#[derive(Debug)]
pub struct BatchRequest {
    pub job_description: String,
    pub criteria: Vec<String>,
    pub priorities: WeightMap,
    pub include_feedback: bool,
}

/// Evaluates every resume and returns ranked results.
///
/// A failed evaluation call only degrades that candidate. The batch itself
/// fails only on an aggregation error (bad weights) or a crashed task.
pub async fn screen_candidates(
    llm: Arc<dyn TextGenerator>,
    permits: Arc<Semaphore>,
    request: BatchRequest,
    resumes: Vec<CandidateResume>,
) -> Result<Vec<CandidateResult>, AppError> {
    let request = Arc::new(request);
    let total = resumes.len();
    let mut tasks = JoinSet::new();

    for (index, resume) in resumes.into_iter().enumerate() {
        let llm = Arc::clone(&llm);
        let permits = Arc::clone(&permits);
        let request = Arc::clone(&request);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(anyhow!("evaluation semaphore closed: {e}")))?;
            let result = screen_one(llm.as_ref(), &request, resume).await?;
            Ok::<_, AppError>((index, result))
        });
    }

    let mut slots: Vec<Option<CandidateResult>> = vec![None; total];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) =
            joined.map_err(|e| AppError::Internal(anyhow!("evaluation task failed: {e}")))??;
        slots[index] = Some(result);
    }

    let mut results: Vec<CandidateResult> = slots.into_iter().flatten().collect();
    let degraded = results.iter().filter(|r| r.status == OutcomeStatus::Degraded).count();
    if degraded > 0 {
        warn!("{degraded} of {total} candidates fell back to default scores");
    }

    rank_candidates(&mut results);
    info!("Screened {total} candidates");
    Ok(results)
}

async fn screen_one(
    llm: &dyn TextGenerator,
    request: &BatchRequest,
    resume: CandidateResume,
) -> Result<CandidateResult, AppError> {
    let (evaluation, status) = evaluate_resume(
        llm,
        &request.job_description,
        &request.criteria,
        &resume.resume_text,
    )
    .await
    .into_parts();

    let overall_score = calculate_overall_score(&evaluation.scores, &request.priorities)?;

    let feedback = if request.include_feedback {
        let outcome = generate_feedback(
            llm,
            &request.job_description,
            &resume.resume_text,
            &evaluation.scores,
        )
        .await;
        if outcome.is_degraded() {
            warn!(candidate = %resume.candidate_name, "Feedback fell back to the default message");
        }
        Some(outcome.into_value())
    } else {
        None
    };

    Ok(CandidateResult {
        candidate_name: resume.candidate_name,
        criteria_scores: evaluation.scores,
        justifications: evaluation.justifications,
        overall_score,
        status,
        feedback,
    })
}
