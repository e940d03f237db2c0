use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::study::Study;

/// Repository trait for Study aggregate
///
/// Defines the contract for persisting and retrieving studies together with
/// their epochs and visits. A study is always loaded and saved as a whole.
///
/// Saves are optimistic: a study carries the version it was loaded at, and a
/// save succeeds only while the stored copy still has that version. Every
/// successful write bumps the version of the caller's study.
#[async_trait]
pub trait StudyRepository: Send + Sync {
    /// Store a new study
    ///
    /// Returns `DomainError::AlreadyExists` when a study with the same uid,
    /// or with the same acronym ignoring case, is already stored. The check
    /// and the insert happen atomically.
    async fn create(&self, study: &mut Study) -> DomainResult<()>;

    /// Replace a stored study with a newer state of it
    ///
    /// Returns `DomainError::NotFound` when the study is not stored (for
    /// example, deleted meanwhile) and `DomainError::Conflict` when it was
    /// saved by someone else since it was loaded.
    async fn save(&self, study: &mut Study) -> DomainResult<()>;

    /// Find a study by its uid
    async fn find_by_id(&self, uid: Uuid) -> DomainResult<Option<Study>>;

    /// All studies, oldest first
    async fn list(&self) -> DomainResult<Vec<Study>>;

    /// Delete a study by uid
    ///
    /// Returns `DomainError::NotFound` when no such study exists.
    async fn delete(&self, uid: Uuid) -> DomainResult<()>;
}
