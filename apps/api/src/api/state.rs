use std::sync::Arc;

use crate::domain::repositories::StudyRepository;
use crate::infrastructure::repositories::InMemoryStudyRepository;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub studies: Arc<dyn StudyRepository>,
}

impl AppState {
    pub fn new(studies: Arc<dyn StudyRepository>) -> Self {
        Self { studies }
    }

    /// State backed by an empty in-memory repository
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStudyRepository::new()))
    }
}
