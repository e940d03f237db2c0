use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{load_study, log_event, ListResponse};
use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::domain::study::Study;

/// Request body for creating a study
#[derive(Debug, Deserialize)]
pub struct CreateStudyRequest {
    pub acronym: String,
}

/// Study summary
#[derive(Debug, Serialize)]
pub struct StudyResponse {
    pub uid: Uuid,
    pub acronym: String,
    pub epoch_count: usize,
    pub visit_count: usize,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Study> for StudyResponse {
    fn from(study: &Study) -> Self {
        Self {
            uid: study.uid(),
            acronym: study.acronym().to_string(),
            epoch_count: study.epochs().len(),
            visit_count: study.visits().len(),
            version: study.version(),
            created_at: study.created_at(),
            updated_at: study.updated_at(),
        }
    }
}

/// Create a new study
///
/// POST /api/studies
pub async fn create_study(
    State(state): State<AppState>,
    Json(req): Json<CreateStudyRequest>,
) -> Result<(StatusCode, Json<StudyResponse>), ApiError> {
    let (mut study, events) = Study::new(req.acronym)?;

    state.studies.create(&mut study).await?;
    events.iter().for_each(log_event);

    Ok((StatusCode::CREATED, Json(StudyResponse::from(&study))))
}

/// List all studies
///
/// GET /api/studies
pub async fn list_studies(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<StudyResponse>>, ApiError> {
    let studies = state.studies.list().await?;
    let responses: Vec<StudyResponse> = studies.iter().map(StudyResponse::from).collect();

    Ok(Json(ListResponse::from(responses)))
}

/// Get a study by uid
///
/// GET /api/studies/:study_uid
pub async fn get_study(
    State(state): State<AppState>,
    Path(study_uid): Path<Uuid>,
) -> Result<Json<StudyResponse>, ApiError> {
    let study = load_study(&state, study_uid).await?;
    Ok(Json(StudyResponse::from(&study)))
}

/// Delete a study with all its epochs and visits
///
/// DELETE /api/studies/:study_uid
pub async fn delete_study(
    State(state): State<AppState>,
    Path(study_uid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.studies.delete(study_uid).await?;
    tracing::info!(%study_uid, "study deleted");

    Ok(StatusCode::NO_CONTENT)
}
