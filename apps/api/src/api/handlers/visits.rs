use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{load_study, log_event, PageQuery, PagedResponse};
use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::domain::errors::DomainError;
use crate::domain::study::Study;
use crate::domain::study_visit::{NewStudyVisit, StudyVisit, VisitClass};
use crate::domain::timeline::DerivedVisit;

/// Filters for listing visits
#[derive(Debug, Deserialize)]
pub struct VisitQuery {
    pub epoch_uid: Option<Uuid>,
    pub visit_class: Option<VisitClass>,
    pub page_number: Option<usize>,
    pub page_size: Option<usize>,
}

impl VisitQuery {
    fn page(&self) -> PageQuery {
        let defaults = PageQuery::default();
        PageQuery {
            page_number: self.page_number.unwrap_or(defaults.page_number),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        }
    }
}

/// Add a visit to a study
///
/// POST /api/studies/:study_uid/study-visits
pub async fn add_visit(
    State(state): State<AppState>,
    Path(study_uid): Path<Uuid>,
    Json(input): Json<NewStudyVisit>,
) -> Result<(StatusCode, Json<DerivedVisit>), ApiError> {
    let mut study = load_study(&state, study_uid).await?;
    let visit = StudyVisit::new(input)?;
    let visit_uid = visit.uid();

    let event = study.add_visit(visit)?;
    state.studies.save(&mut study).await?;
    log_event(&event);

    Ok((StatusCode::CREATED, Json(derived_visit(&study, visit_uid)?)))
}

/// List the derived visits of a study in timeline order
///
/// GET /api/studies/:study_uid/study-visits
pub async fn list_visits(
    State(state): State<AppState>,
    Path(study_uid): Path<Uuid>,
    Query(query): Query<VisitQuery>,
) -> Result<Json<PagedResponse<DerivedVisit>>, ApiError> {
    let study = load_study(&state, study_uid).await?;
    let visits: Vec<DerivedVisit> = study
        .timeline()?
        .visits
        .into_iter()
        .filter(|visit| query.epoch_uid.map_or(true, |uid| visit.epoch_uid == uid))
        .filter(|visit| query.visit_class.map_or(true, |class| visit.visit_class == class))
        .collect();

    Ok(Json(query.page().paginate(visits)?))
}

/// Get one derived visit
///
/// GET /api/studies/:study_uid/study-visits/:uid
pub async fn get_visit(
    State(state): State<AppState>,
    Path((study_uid, uid)): Path<(Uuid, Uuid)>,
) -> Result<Json<DerivedVisit>, ApiError> {
    let study = load_study(&state, study_uid).await?;
    if study.visit(uid).is_none() {
        return Err(DomainError::not_found(format!("Study visit not found: {}", uid)).into());
    }

    Ok(Json(derived_visit(&study, uid)?))
}

/// Replace the attributes of a visit
///
/// PUT /api/studies/:study_uid/study-visits/:uid
pub async fn edit_visit(
    State(state): State<AppState>,
    Path((study_uid, uid)): Path<(Uuid, Uuid)>,
    Json(input): Json<NewStudyVisit>,
) -> Result<Json<DerivedVisit>, ApiError> {
    let mut study = load_study(&state, study_uid).await?;

    let event = study.edit_visit(uid, input)?;
    state.studies.save(&mut study).await?;
    log_event(&event);

    Ok(Json(derived_visit(&study, uid)?))
}

/// Remove a visit
///
/// DELETE /api/studies/:study_uid/study-visits/:uid
pub async fn delete_visit(
    State(state): State<AppState>,
    Path((study_uid, uid)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let mut study = load_study(&state, study_uid).await?;

    let event = study.remove_visit(uid)?;
    state.studies.save(&mut study).await?;
    log_event(&event);

    Ok(StatusCode::NO_CONTENT)
}

fn derived_visit(study: &Study, uid: Uuid) -> Result<DerivedVisit, ApiError> {
    study
        .timeline()?
        .visit(uid)
        .cloned()
        .ok_or_else(|| ApiError::internal_server_error(format!("Visit {} missing from timeline", uid)))
}
