//! Axum route handlers for the Resume intake API.

use axum::{extract::Multipart, Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::resumes::extract::{extract_resume_text, ExtractedResume};

/// Upper bound on one multipart upload request.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct RejectedFile {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub resumes: Vec<ExtractedResume>,
    pub rejected: Vec<RejectedFile>,
}

/// POST /api/v1/resumes/extract
///
/// Multipart upload of one or more resume files (PDF, DOCX or plain text).
/// Files that cannot be read are reported under `rejected`; the rest still
/// come back. If no file is usable the first extraction error is returned.
/// Fields without a file name are ignored.
pub async fn handle_extract_resumes(
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let mut resumes = Vec::new();
    let mut rejected = Vec::new();
    let mut first_error = None;
    let mut seen_files = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        seen_files += 1;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read '{file_name}': {e}")))?;

        let name = file_name.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_resume_text(&name, data))
            .await
            .map_err(|e| anyhow::anyhow!("text extraction task failed for '{file_name}': {e}"))?;

        match extracted {
            Ok(resume) => resumes.push(resume),
            Err(e) => {
                warn!("Rejected upload: {e}");
                rejected.push(RejectedFile {
                    file_name,
                    reason: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    if seen_files == 0 {
        return Err(AppError::Validation("no files uploaded".to_string()));
    }
    if resumes.is_empty() {
        if let Some(e) = first_error {
            return Err(e.into());
        }
    }

    info!(
        "Extracted {} resumes ({} rejected)",
        resumes.len(),
        rejected.len()
    );
    Ok(Json(ExtractResponse { resumes, rejected }))
}
