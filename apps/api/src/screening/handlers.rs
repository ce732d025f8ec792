//! Axum route handlers for the Screening API.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::screening::aggregate::best_candidate;
use crate::screening::batch::{screen_candidates, BatchRequest};
use crate::screening::criteria::extract_criteria;
use crate::screening::export::{write_detailed_results_csv, write_results_csv};
use crate::screening::models::{
    CandidateResult, CandidateResume, StoredEvaluation, WeightMap, MAX_PRIORITY, MIN_PRIORITY,
};
use crate::screening::outcome::OutcomeStatus;
use crate::session::handlers::{parse_optional_session_id, parse_session_id};
use crate::state::AppState;

const SESSION_KEY_JOB_DESCRIPTION: &str = "job_description";
const SESSION_KEY_CRITERIA: &str = "criteria";
const SESSION_KEY_EVALUATION: &str = "evaluation";

// Request / Response types

#[derive(Debug, Deserialize)]
pub struct CriteriaRequest {
    pub job_description: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CriteriaResponse {
    pub criteria: Vec<String>,
    pub status: OutcomeStatus,
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    pub job_description: String,
    pub criteria: Vec<String>,
    pub priorities: WeightMap,
    pub resumes: Vec<CandidateResume>,
    #[serde(default)]
    pub include_feedback: bool,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub session_id: Uuid,
    pub best_candidate: Option<String>,
    pub results: Vec<CandidateResult>,
}

// Validation

fn validate_evaluation_request(request: &EvaluationRequest) -> Result<(), AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    if request.criteria.is_empty() {
        return Err(AppError::Validation("criteria cannot be empty".to_string()));
    }
    if request.criteria.iter().any(|c| c.trim().is_empty()) {
        return Err(AppError::Validation(
            "criteria labels cannot be blank".to_string(),
        ));
    }
    if request.resumes.is_empty() {
        return Err(AppError::Validation("resumes cannot be empty".to_string()));
    }
    if let Some((criterion, weight)) = request
        .priorities
        .iter()
        .find(|(_, w)| !(MIN_PRIORITY..=MAX_PRIORITY).contains(*w))
    {
        return Err(AppError::Validation(format!(
            "priority for '{criterion}' must be between {MIN_PRIORITY} and {MAX_PRIORITY}, got {weight}"
        )));
    }
    if let Some(criterion) = request
        .criteria
        .iter()
        .find(|c| !request.priorities.contains_key(*c))
    {
        return Err(AppError::Validation(format!(
            "no priority given for criterion '{criterion}'"
        )));
    }
    Ok(())
}

// Handlers

/// POST /api/v1/criteria
///
/// Derives evaluation criteria from a job description.
/// Always answers with a usable list; `status` says whether it is the fallback.
pub async fn handle_extract_criteria(
    State(state): State<AppState>,
    Json(request): Json<CriteriaRequest>,
) -> Result<Json<CriteriaResponse>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let session = state
        .sessions
        .resolve(parse_optional_session_id(request.session_id.as_deref())?);
    let outcome = extract_criteria(state.llm.as_ref(), &request.job_description).await;
    let status = outcome.status();

    state.sessions.set_typed(
        &session,
        SESSION_KEY_JOB_DESCRIPTION,
        &request.job_description,
    );
    state
        .sessions
        .set_typed(&session, SESSION_KEY_CRITERIA, outcome.value());
    let criteria = outcome.into_value();

    info!(session_id = %session.id, ?status, "Extracted {} criteria", criteria.len());

    Ok(Json(CriteriaResponse {
        criteria,
        status,
        session_id: session.id,
    }))
}

/// POST /api/v1/evaluations
///
/// Scores every resume against the criteria and returns candidates ranked by
/// overall score. Candidates whose evaluation call failed carry `status: degraded`.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluationRequest>,
) -> Result<Json<EvaluationResponse>, AppError> {
    validate_evaluation_request(&request)?;
    let requested_session = parse_optional_session_id(request.session_id.as_deref())?;

    let session = state.sessions.resolve(requested_session);
    info!(
        session_id = %session.id,
        new_session = session.is_new,
        "Evaluating {} resumes against {} criteria",
        request.resumes.len(),
        request.criteria.len()
    );

    let batch = BatchRequest {
        job_description: request.job_description,
        criteria: request.criteria,
        priorities: request.priorities,
        include_feedback: request.include_feedback,
    };
    let criteria = batch.criteria.clone();
    let priorities = batch.priorities.clone();

    let results = screen_candidates(
        Arc::clone(&state.llm),
        Arc::clone(&state.evaluation_permits),
        batch,
        request.resumes,
    )
    .await?;
    let best = best_candidate(&results).map(str::to_string);

    state.sessions.set_typed(
        &session,
        SESSION_KEY_EVALUATION,
        &StoredEvaluation {
            criteria,
            priorities,
            results: results.clone(),
            best_candidate: best.clone(),
            evaluated_at: Utc::now(),
        },
    );

    Ok(Json(EvaluationResponse {
        session_id: session.id,
        best_candidate: best,
        results,
    }))
}

fn load_evaluation(state: &AppState, raw_session_id: &str) -> Result<StoredEvaluation, AppError> {
    let session_id = parse_session_id(raw_session_id)?;
    state
        .sessions
        .get_typed(session_id, SESSION_KEY_EVALUATION)
        .ok_or_else(|| AppError::NotFound(format!("No results for session {session_id}")))
}

fn csv_attachment(
    csv: String,
    file_prefix: &str,
    stored: &StoredEvaluation,
) -> ([(header::HeaderName, String); 2], String) {
    let disposition = format!(
        "attachment; filename=\"{file_prefix}_{}.csv\"",
        stored.evaluated_at.format("%Y%m%d_%H%M%S")
    );
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
}

/// GET /api/v1/sessions/:id/results.csv
///
/// Downloads the session's most recent evaluation as CSV.
pub async fn handle_export_results(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stored = load_evaluation(&state, &session_id)?;
    let csv = write_results_csv(&stored.criteria, &stored.priorities, &stored.results)
        .map_err(|e| AppError::Export(format!("{e:#}")))?;
    Ok(csv_attachment(csv, "screening_results", &stored))
}

/// GET /api/v1/sessions/:id/results_detailed.csv
///
/// Same rows as `results.csv`, with a score and a justification column per criterion.
pub async fn handle_export_detailed_results(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stored = load_evaluation(&state, &session_id)?;
    let csv = write_detailed_results_csv(&stored.criteria, &stored.results)
        .map_err(|e| AppError::Export(format!("{e:#}")))?;
    Ok(csv_attachment(csv, "detailed_screening_results", &stored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{CannedGenerator, FailingGenerator, RoutedGenerator};
    use crate::llm_client::TextGenerator;
    use crate::routes::build_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(llm: impl TextGenerator + 'static) -> (axum::Router, AppState) {
        let state = AppState::for_tests(Arc::new(llm));
        (build_router(state.clone()), state)
    }

    async fn post_json(router: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn evaluation_body() -> Value {
        json!({
            "job_description": "Senior Rust engineer",
            "criteria": ["Rust", "Communication"],
            "priorities": {"Rust": 3, "Communication": 1},
            "resumes": [
                {"candidate_name": "alice", "resume_text": "MARKER_ALICE"},
                {"candidate_name": "bob", "resume_text": "MARKER_BOB"}
            ]
        })
    }

    #[tokio::test]
    async fn test_criteria_success() {
        let (router, _) = app(CannedGenerator::new("Rust\nTokio\nThis is a sentence."));
        let (status, body) = post_json(
            router,
            "/api/v1/criteria",
            json!({"job_description": "Rust dev"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["criteria"], json!(["Rust", "Tokio"]));
        assert_eq!(body["status"], "success");
        assert!(body["session_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_criteria_degraded_is_still_ok() {
        let (router, _) = app(FailingGenerator);
        let (status, body) = post_json(
            router,
            "/api/v1/criteria",
            json!({"job_description": "Rust dev"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["criteria"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_criteria_rejects_blank_job_description() {
        let (router, _) = app(FailingGenerator);
        let (status, body) =
            post_json(router, "/api/v1/criteria", json!({"job_description": "  "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_criteria_keeps_given_session() {
        let (router, state) = app(CannedGenerator::new("Rust"));
        let session = state.sessions.resolve(None);
        let (_, body) = post_json(
            router,
            "/api/v1/criteria",
            json!({"job_description": "Rust dev", "session_id": session.id}),
        )
        .await;

        assert_eq!(body["session_id"], json!(session.id));
        assert_eq!(
            state.sessions.get(session.id, "criteria"),
            Some(json!(["Rust"]))
        );
    }

    #[tokio::test]
    async fn test_evaluate_ranks_and_records_session() {
        let (router, state) = app(RoutedGenerator::new(&[
            ("MARKER_ALICE", "Rust: 5\nCommunication: 9"),
            ("MARKER_BOB", "Rust: 9\nJustification: Strong.\nCommunication: 5"),
        ]));
        let (status, body) = post_json(router, "/api/v1/evaluations", evaluation_body()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["best_candidate"], "bob");
        let results = body["results"].as_array().unwrap();
        assert_eq!(results[0]["candidate_name"], "bob");
        assert_eq!(results[0]["criteria_scores"]["Rust"], 9);
        assert_eq!(results[0]["justifications"]["Rust"], "Strong.");
        // (9*3 + 5*1) / 4 = 8.0
        assert_eq!(results[0]["overall_score"], 80.0);
        assert_eq!(results[1]["candidate_name"], "alice");
        assert!(results[0].get("feedback").is_none());

        let session_id: Uuid = serde_json::from_value(body["session_id"].clone()).unwrap();
        let stored: StoredEvaluation = state
            .sessions
            .get_typed(session_id, SESSION_KEY_EVALUATION)
            .unwrap();
        assert_eq!(stored.results.len(), 2);
        assert_eq!(stored.best_candidate.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_evaluate_degraded_candidates_use_fallback() {
        let (router, _) = app(FailingGenerator);
        let (status, body) = post_json(router, "/api/v1/evaluations", evaluation_body()).await;

        assert_eq!(status, StatusCode::OK);
        for result in body["results"].as_array().unwrap() {
            assert_eq!(result["status"], "degraded");
            assert_eq!(result["criteria_scores"]["Rust"], 5);
            assert_eq!(result["overall_score"], 50.0);
        }
    }

    #[tokio::test]
    async fn test_evaluate_validation_errors() {
        let cases = [
            ("priorities", json!({"Rust": 0, "Communication": 1})),
            ("priorities", json!({"Rust": 11, "Communication": 1})),
            ("priorities", json!({"Rust": 3})),
            ("criteria", json!([])),
            ("criteria", json!(["Rust", " "])),
            ("resumes", json!([])),
            ("job_description", json!("")),
        ];
        for (field, value) in cases {
            let mut body = evaluation_body();
            body[field] = value.clone();
            let (router, _) = app(FailingGenerator);
            let (status, response) = post_json(router, "/api/v1/evaluations", body).await;
            assert_eq!(
                status,
                StatusCode::BAD_REQUEST,
                "{field} = {value} should be rejected, got {response}"
            );
        }
    }

    #[tokio::test]
    async fn test_export_after_evaluation() {
        let (router, state) = app(RoutedGenerator::new(&[
            ("MARKER_ALICE", "Rust: 5\nCommunication: 9"),
            ("MARKER_BOB", "Rust: 9\nCommunication: 5"),
        ]));
        let (_, body) = post_json(router.clone(), "/api/v1/evaluations", evaluation_body()).await;
        let session_id = body["session_id"].as_str().unwrap().to_string();
        assert!(state.sessions.exists(Uuid::parse_str(&session_id).unwrap()));

        let response = router
            .oneshot(
                Request::get(format!("/api/v1/sessions/{session_id}/results.csv"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Candidate,Overall Score (%),Rust (Priority: 3),Communication (Priority: 1)"
        );
        assert_eq!(lines[1], "bob,80.00,9,5");
        assert_eq!(lines[2], "alice,60.00,5,9");
    }

    #[tokio::test]
    async fn test_detailed_export_carries_justifications() {
        let (router, _) = app(RoutedGenerator::new(&[
            ("MARKER_ALICE", "Rust: 5\nCommunication: 9\nJustification: Clear writer."),
            ("MARKER_BOB", "Rust: 9\nJustification: Strong.\nCommunication: 5"),
        ]));
        let (_, body) = post_json(router.clone(), "/api/v1/evaluations", evaluation_body()).await;
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let response = router
            .oneshot(
                Request::get(format!("/api/v1/sessions/{session_id}/results_detailed.csv"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"detailed_screening_results_"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Candidate,Overall Score (%),Rust (Score),Rust (Justification),Communication (Score),Communication (Justification)",
                "bob,80.00,9,Strong.,5,No justification provided.",
                "alice,60.00,5,No justification provided.,9,Clear writer.",
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_session_id_in_body_is_a_validation_error() {
        let (router, _) = app(CannedGenerator::new("Rust"));
        let (status, body) = post_json(
            router.clone(),
            "/api/v1/criteria",
            json!({"job_description": "Rust dev", "session_id": "not-a-uuid"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let mut evaluation = evaluation_body();
        evaluation["session_id"] = json!("not-a-uuid");
        let (status, body) = post_json(router, "/api/v1/evaluations", evaluation).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_export_unknown_session_is_not_found() {
        let (router, _) = app(FailingGenerator);
        let response = router
            .oneshot(
                Request::get(format!("/api/v1/sessions/{}/results.csv", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
