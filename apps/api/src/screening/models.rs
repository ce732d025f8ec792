use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::screening::outcome::OutcomeStatus;

/// Criterion label -> 0..=10 score.
pub type ScoreMap = BTreeMap<String, u8>;

/// Criterion label -> 1..=10 priority weight.
pub type WeightMap = BTreeMap<String, u8>;

pub const MAX_CRITERION_SCORE: u8 = 10;
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// Parsed reply of one evaluation call for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeEvaluation {
    pub scores: ScoreMap,
    pub justifications: BTreeMap<String, String>,
}

/// One resume submitted for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResume {
    pub candidate_name: String,
    pub resume_text: String,
}

/// Everything the rendering layer needs for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_name: String,
    pub criteria_scores: ScoreMap,
    pub justifications: BTreeMap<String, String>,
    pub overall_score: f64,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Last evaluation run recorded in a session, used for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvaluation {
    pub criteria: Vec<String>,
    pub priorities: WeightMap,
    pub results: Vec<CandidateResult>,
    pub best_candidate: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}
