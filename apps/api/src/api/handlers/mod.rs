// HTTP handlers grouped by resource

pub mod epochs;
pub mod health;
pub mod studies;
pub mod timeline;
pub mod visits;

use serde::Serialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::domain::errors::DomainError;
use crate::domain::study::{Study, StudyEvent};

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Unpaged collection response
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

/// One page of a collection; `total` counts every matching item
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
}

/// Requested page; `page_size = 0` returns everything
#[derive(Debug, Clone, Copy)]
pub struct PageQuery {
    /// 1-based
    pub page_number: usize,
    pub page_size: usize,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    pub fn paginate<T>(&self, items: Vec<T>) -> Result<PagedResponse<T>, ApiError> {
        if self.page_number == 0 {
            return Err(ApiError::unprocessable_entity(
                "page_number must be at least 1",
            ));
        }

        let total = items.len();
        let items = if self.page_size == 0 {
            items
        } else {
            items
                .into_iter()
                .skip((self.page_number - 1).saturating_mul(self.page_size))
                .take(self.page_size)
                .collect()
        };

        Ok(PagedResponse {
            items,
            total,
            page: self.page_number,
            size: self.page_size,
        })
    }
}

/// Loads a study or fails with 404
pub(crate) async fn load_study(state: &AppState, study_uid: Uuid) -> Result<Study, ApiError> {
    state
        .studies
        .find_by_id(study_uid)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Study not found: {}", study_uid)).into())
}

pub(crate) fn log_event(event: &StudyEvent) {
    tracing::info!(
        event = event.name(),
        study_uid = %event.study_uid(),
        "{:?}",
        event
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_page_size_returns_everything() {
        let query = PageQuery {
            page_number: 1,
            page_size: 0,
        };
        let page = query.paginate((1..=25).collect::<Vec<_>>()).unwrap();

        assert_eq!(page.items.len(), 25);
        assert_eq!(page.total, 25);
    }

    #[test]
    fn pages_are_cut_from_the_full_list() {
        let query = PageQuery {
            page_number: 3,
            page_size: 10,
        };
        let page = query.paginate((1..=25).collect::<Vec<_>>()).unwrap();

        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let query = PageQuery {
            page_number: 4,
            page_size: 10,
        };
        let page = query.paginate((1..=25).collect::<Vec<_>>()).unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.total, 25);
    }

    #[test]
    fn page_zero_is_rejected() {
        let query = PageQuery {
            page_number: 0,
            page_size: 10,
        };
        let error = query.paginate(vec![1]).unwrap_err();
        assert_eq!(error.status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
