use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::load_study;
use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::domain::errors::DomainResult;
use crate::domain::study_epoch::{NewStudyEpoch, StudyEpoch};
use crate::domain::study_visit::{NewStudyVisit, StudyVisit};
use crate::domain::timeline::{derive_timeline, Timeline};

/// An epoch of a preview request; a uid is generated when absent
#[derive(Debug, Deserialize)]
pub struct PreviewEpoch {
    #[serde(default)]
    pub uid: Option<Uuid>,
    #[serde(flatten)]
    pub epoch: NewStudyEpoch,
}

/// A visit of a preview request; a uid is generated when absent
#[derive(Debug, Deserialize)]
pub struct PreviewVisit {
    #[serde(default)]
    pub uid: Option<Uuid>,
    #[serde(flatten)]
    pub visit: NewStudyVisit,
}

/// Request body for a stateless timeline derivation
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub epochs: Vec<PreviewEpoch>,
    #[serde(default)]
    pub visits: Vec<PreviewVisit>,
}

impl PreviewRequest {
    fn into_parts(self) -> DomainResult<(Vec<StudyEpoch>, Vec<StudyVisit>)> {
        let epochs = self
            .epochs
            .into_iter()
            .map(|e| StudyEpoch::with_uid(e.uid.unwrap_or_else(Uuid::new_v4), e.epoch))
            .collect::<DomainResult<Vec<_>>>()?;
        let visits = self
            .visits
            .into_iter()
            .map(|v| StudyVisit::with_uid(v.uid.unwrap_or_else(Uuid::new_v4), v.visit))
            .collect::<DomainResult<Vec<_>>>()?;

        Ok((epochs, visits))
    }
}

/// Get the full derived timeline of a study
///
/// GET /api/studies/:study_uid/timeline
pub async fn get_timeline(
    State(state): State<AppState>,
    Path(study_uid): Path<Uuid>,
) -> Result<Json<Timeline>, ApiError> {
    let study = load_study(&state, study_uid).await?;
    Ok(Json(study.timeline()?))
}

/// Derive a timeline from posted epochs and visits without storing anything
///
/// POST /api/timeline/preview
pub async fn preview_timeline(Json(req): Json<PreviewRequest>) -> Result<Json<Timeline>, ApiError> {
    let (epochs, visits) = req.into_parts()?;
    let timeline = derive_timeline(&epochs, &visits)?;
    tracing::debug!(
        epochs = timeline.epochs.len(),
        visits = timeline.visits.len(),
        "timeline preview derived"
    );

    Ok(Json(timeline))
}
