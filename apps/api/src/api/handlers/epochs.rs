use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{load_study, log_event, ListResponse};
use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::domain::study::Study;
use crate::domain::study_epoch::{EpochEdit, NewStudyEpoch, StudyEpoch};
use crate::domain::timeline::DerivedEpoch;

/// Request body for adding an epoch
#[derive(Debug, Deserialize)]
pub struct CreateEpochRequest {
    #[serde(flatten)]
    pub epoch: NewStudyEpoch,
    /// 1-based position; appended when absent
    #[serde(default)]
    pub order: Option<usize>,
}

/// Add an epoch to a study
///
/// POST /api/studies/:study_uid/study-epochs
pub async fn add_epoch(
    State(state): State<AppState>,
    Path(study_uid): Path<Uuid>,
    Json(req): Json<CreateEpochRequest>,
) -> Result<(StatusCode, Json<DerivedEpoch>), ApiError> {
    let mut study = load_study(&state, study_uid).await?;
    let epoch = StudyEpoch::new(req.epoch)?;
    let epoch_uid = epoch.uid();

    let event = study.add_epoch(epoch, req.order)?;
    state.studies.save(&mut study).await?;
    log_event(&event);

    Ok((StatusCode::CREATED, Json(derived_epoch(&study, epoch_uid)?)))
}

/// List the derived epochs of a study in study order
///
/// GET /api/studies/:study_uid/study-epochs
pub async fn list_epochs(
    State(state): State<AppState>,
    Path(study_uid): Path<Uuid>,
) -> Result<Json<ListResponse<DerivedEpoch>>, ApiError> {
    let study = load_study(&state, study_uid).await?;
    let timeline = study.timeline()?;

    Ok(Json(ListResponse::from(timeline.epochs)))
}

/// Edit the descriptive attributes of an epoch
///
/// PATCH /api/studies/:study_uid/study-epochs/:uid
pub async fn edit_epoch(
    State(state): State<AppState>,
    Path((study_uid, uid)): Path<(Uuid, Uuid)>,
    Json(edit): Json<EpochEdit>,
) -> Result<Json<DerivedEpoch>, ApiError> {
    let mut study = load_study(&state, study_uid).await?;

    let event = study.edit_epoch(uid, edit)?;
    state.studies.save(&mut study).await?;
    log_event(&event);

    Ok(Json(derived_epoch(&study, uid)?))
}

/// Move an epoch to another position
///
/// PATCH /api/studies/:study_uid/study-epochs/:uid/order/:new_order
pub async fn reorder_epoch(
    State(state): State<AppState>,
    Path((study_uid, uid, new_order)): Path<(Uuid, Uuid, usize)>,
) -> Result<Json<DerivedEpoch>, ApiError> {
    let mut study = load_study(&state, study_uid).await?;

    let event = study.reorder_epoch(uid, new_order)?;
    state.studies.save(&mut study).await?;
    log_event(&event);

    Ok(Json(derived_epoch(&study, uid)?))
}

/// Remove an epoch without visits
///
/// DELETE /api/studies/:study_uid/study-epochs/:uid
pub async fn delete_epoch(
    State(state): State<AppState>,
    Path((study_uid, uid)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let mut study = load_study(&state, study_uid).await?;

    let event = study.remove_epoch(uid)?;
    state.studies.save(&mut study).await?;
    log_event(&event);

    Ok(StatusCode::NO_CONTENT)
}

fn derived_epoch(study: &Study, uid: Uuid) -> Result<DerivedEpoch, ApiError> {
    study
        .timeline()?
        .epoch(uid)
        .cloned()
        .ok_or_else(|| ApiError::internal_server_error(format!("Epoch {} missing from timeline", uid)))
}
