//! Score Aggregator: weighted mean of per-criterion scores as a percentage.
//!
//! overall = Σ(score × weight[criterion]) / Σ(all weights) / 10 × 100
//!
//! The denominator covers every entry of the weight map, scored or not, so an
//! unscored criterion pulls the overall score down.

use std::cmp::Ordering;

use thiserror::Error;

use crate::screening::models::{CandidateResult, ScoreMap, WeightMap, MAX_CRITERION_SCORE};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("total priority weight is zero")]
    ZeroTotalWeight,

    #[error("no priority weight for criterion '{0}'")]
    MissingWeight(String),
}

/// Pure and deterministic; invariant to scaling every weight by the same factor.
pub fn calculate_overall_score(scores: &ScoreMap, weights: &WeightMap) -> Result<f64, AggregateError> {
    let total_weight: u64 = weights.values().map(|w| u64::from(*w)).sum();
    if total_weight == 0 {
        return Err(AggregateError::ZeroTotalWeight);
    }

    let mut weighted_sum: u64 = 0;
    for (criterion, score) in scores {
        let weight = weights
            .get(criterion)
            .ok_or_else(|| AggregateError::MissingWeight(criterion.clone()))?;
        weighted_sum += u64::from(*score) * u64::from(*weight);
    }

    let weighted_mean = weighted_sum as f64 / total_weight as f64;
    Ok(weighted_mean / f64::from(MAX_CRITERION_SCORE) * 100.0)
}

/// Sorts by overall score, highest first. Ties keep submission order.
pub fn rank_candidates(results: &mut [CandidateResult]) {
    results.sort_by(|a, b| {
        b.overall_score
            .partial_cmp(&a.overall_score)
            .unwrap_or(Ordering::Equal)
    });
}

/// Name of the top candidate of an already ranked slice.
pub fn best_candidate(ranked: &[CandidateResult]) -> Option<&str> {
    ranked.first().map(|r| r.candidate_name.as_str())
}
