//! Axum route handlers for the Ranking API.

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use crate::errors::AppError;
use crate::extraction::CandidateDocument;
use crate::ranking::upload::UploadNamer;
use crate::ranking::{rank_candidates, AnalysisResult};
use crate::state::AppState;

const JOB_DESCRIPTION_FIELD: &str = "job_description";
const RESUME_FIELD: &str = "resumes";
const MISSING_INPUT_MESSAGE: &str =
    "Please upload at least one resume and enter a job description";

/// POST /api/v1/rankings
///
/// Multipart body: one `job_description` text field and one or more `resumes`
/// file parts. Returns the top candidates with scores and the analysis narrative.
pub async fn handle_rank(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, AppError> {
    let mut job_description = String::new();
    let mut documents = Vec::new();
    let mut namer = UploadNamer::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(JOB_DESCRIPTION_FIELD) => {
                job_description = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid job description: {e}")))?;
            }
            Some(RESUME_FIELD) => {
                let original = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
                if original.as_deref().unwrap_or_default().is_empty() && bytes.is_empty() {
                    // Browsers send an empty part when no file was chosen.
                    continue;
                }
                let filename = namer.assign(original.as_deref(), content_type.as_deref());
                documents.push(CandidateDocument::new(filename, bytes));
            }
            _ => {}
        }
    }

    if job_description.trim().is_empty() || documents.is_empty() {
        return Err(AppError::Validation(MISSING_INPUT_MESSAGE.to_string()));
    }

    info!("Ranking {} uploaded candidates", documents.len());
    let result = rank_candidates(
        state.generator.as_ref(),
        &state.config.ranking,
        &job_description,
        documents,
    )
    .await?;

    Ok(Json(result))
}
