use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::repositories::StudyRepository;
use crate::domain::study::Study;

/// In-memory implementation of StudyRepository
///
/// Keeps whole study aggregates in a map guarded by an async lock. Reads hand
/// out clones, so a caller mutating a loaded study never affects the stored
/// copy until it is saved again. Version checks run under the write lock.
#[derive(Debug, Default)]
pub struct InMemoryStudyRepository {
    studies: RwLock<HashMap<Uuid, Study>>,
}

impl InMemoryStudyRepository {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudyRepository for InMemoryStudyRepository {
    async fn create(&self, study: &mut Study) -> DomainResult<()> {
        let mut studies = self.studies.write().await;

        if studies.contains_key(&study.uid()) {
            return Err(DomainError::already_exists(format!(
                "Study already exists: {}",
                study.uid()
            )));
        }
        let acronym = study.acronym().to_lowercase();
        if studies
            .values()
            .any(|stored| stored.acronym().to_lowercase() == acronym)
        {
            return Err(DomainError::already_exists(format!(
                "Study with acronym {} already exists",
                study.acronym()
            )));
        }

        study.increment_version();
        studies.insert(study.uid(), study.clone());
        Ok(())
    }

    async fn save(&self, study: &mut Study) -> DomainResult<()> {
        let mut studies = self.studies.write().await;

        let stored = studies
            .get(&study.uid())
            .ok_or_else(|| DomainError::not_found(format!("Study not found: {}", study.uid())))?;
        if stored.version() != study.version() {
            return Err(DomainError::conflict(format!(
                "Study {} was modified concurrently (stored version {}, yours {})",
                study.uid(),
                stored.version(),
                study.version()
            )));
        }

        study.increment_version();
        studies.insert(study.uid(), study.clone());
        Ok(())
    }

    async fn find_by_id(&self, uid: Uuid) -> DomainResult<Option<Study>> {
        let studies = self.studies.read().await;
        Ok(studies.get(&uid).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Study>> {
        let studies = self.studies.read().await;
        let mut all: Vec<Study> = studies.values().cloned().collect();
        all.sort_by_key(|study| (study.created_at(), study.uid()));
        Ok(all)
    }

    async fn delete(&self, uid: Uuid) -> DomainResult<()> {
        let mut studies = self.studies.write().await;
        studies
            .remove(&uid)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("Study not found: {}", uid)))
    }
}
