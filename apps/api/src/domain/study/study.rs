use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::events::StudyEvent;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::study_epoch::{EpochEdit, StudyEpoch};
use crate::domain::study_visit::{NewStudyVisit, StudyVisit};
use crate::domain::timeline::{derive_timeline, Timeline};

/// Study aggregate root
///
/// Owns the epochs and visits of one study and keeps them laid out on a
/// single consistent timeline.
///
/// # Invariants
/// - Acronym cannot be empty
/// - Epoch and visit uids are unique within the study
/// - The timeline derived from epochs and visits is always valid: every
///   mutation is checked against a candidate state and only committed when
///   the derivation succeeds
/// - A visit or epoch cannot be removed while other visits depend on it
///
/// # Example
/// ```
/// use clinical_mdr_api::domain::study::Study;
///
/// let (study, events) = Study::new("CDISC-PILOT".to_string()).expect("valid study");
///
/// assert_eq!(study.acronym(), "CDISC-PILOT");
/// assert!(study.visits().is_empty());
/// assert_eq!(events.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Study {
    uid: Uuid,
    acronym: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Number of times the study was written to its repository
    version: u64,
    epochs: Vec<StudyEpoch>,
    visits: Vec<StudyVisit>,
}

impl Study {
    /// Creates a new Study aggregate
    ///
    /// # Arguments
    /// * `acronym` - Short study identifier (cannot be blank)
    ///
    /// # Returns
    /// * `Ok((Study, Vec<StudyEvent>))` - New study and events generated
    /// * `Err(DomainError::Validation)` - If the acronym is blank
    pub fn new(acronym: String) -> DomainResult<(Self, Vec<StudyEvent>)> {
        let acronym = acronym.trim().to_string();
        if acronym.is_empty() {
            return Err(DomainError::validation("Study acronym cannot be empty"));
        }

        let now = Utc::now();
        let study = Self {
            uid: Uuid::new_v4(),
            acronym,
            created_at: now,
            updated_at: now,
            version: 0,
            epochs: Vec::new(),
            visits: Vec::new(),
        };

        let events = vec![StudyEvent::Created {
            study_uid: study.uid,
            acronym: study.acronym.clone(),
        }];

        Ok((study, events))
    }

    /// Adds an epoch to the study
    ///
    /// # Arguments
    /// * `epoch` - The epoch to add
    /// * `order` - 1-based position; appended at the end when `None`
    ///
    /// # Business Rules
    /// - Position must be between 1 and the number of epochs plus one
    /// - Epochs after the insertion point move one position down
    pub fn add_epoch(&mut self, epoch: StudyEpoch, order: Option<usize>) -> DomainResult<StudyEvent> {
        if self.epoch(epoch.uid()).is_some() {
            return Err(DomainError::already_exists(format!(
                "Study epoch {} already exists",
                epoch.uid()
            )));
        }

        let order = order.unwrap_or(self.epochs.len() + 1);
        if order == 0 || order > self.epochs.len() + 1 {
            return Err(DomainError::validation(format!(
                "Epoch order must be between 1 and {}, got {}",
                self.epochs.len() + 1,
                order
            )));
        }

        let epoch_uid = epoch.uid();
        let mut epochs = self.epochs.clone();
        epochs.insert(order - 1, epoch);
        self.commit(epochs, self.visits.clone())?;

        Ok(StudyEvent::EpochAdded {
            study_uid: self.uid,
            epoch_uid,
            order,
        })
    }

    /// Applies a partial edit to an epoch
    pub fn edit_epoch(&mut self, epoch_uid: Uuid, edit: EpochEdit) -> DomainResult<StudyEvent> {
        let index = self.epoch_index(epoch_uid)?;
        let edited = self.epochs[index].edit(edit)?;

        let mut epochs = self.epochs.clone();
        epochs[index] = edited;
        self.commit(epochs, self.visits.clone())?;

        Ok(StudyEvent::EpochEdited {
            study_uid: self.uid,
            epoch_uid,
        })
    }

    /// Moves an epoch to a new 1-based position
    ///
    /// # Business Rules
    /// - The new position must exist
    /// - The move is rejected when the visits would no longer follow
    ///   epoch order in time
    pub fn reorder_epoch(&mut self, epoch_uid: Uuid, new_order: usize) -> DomainResult<StudyEvent> {
        let index = self.epoch_index(epoch_uid)?;
        if new_order == 0 || new_order > self.epochs.len() {
            return Err(DomainError::validation(format!(
                "Epoch order must be between 1 and {}, got {}",
                self.epochs.len(),
                new_order
            )));
        }

        let mut epochs = self.epochs.clone();
        let epoch = epochs.remove(index);
        epochs.insert(new_order - 1, epoch);
        self.commit(epochs, self.visits.clone())
            .map_err(|e| DomainError::business_logic(format!("Cannot reorder epoch: {}", e)))?;

        Ok(StudyEvent::EpochReordered {
            study_uid: self.uid,
            epoch_uid,
            old_order: index + 1,
            new_order,
        })
    }

    /// Removes an epoch that no visit belongs to
    pub fn remove_epoch(&mut self, epoch_uid: Uuid) -> DomainResult<StudyEvent> {
        let index = self.epoch_index(epoch_uid)?;
        let in_use = self.visits.iter().filter(|v| v.epoch_uid() == epoch_uid).count();
        if in_use > 0 {
            return Err(DomainError::business_logic(format!(
                "Study epoch {} still has {} visits",
                epoch_uid, in_use
            )));
        }

        let mut epochs = self.epochs.clone();
        epochs.remove(index);
        self.commit(epochs, self.visits.clone())?;

        Ok(StudyEvent::EpochRemoved {
            study_uid: self.uid,
            epoch_uid,
        })
    }

    /// Adds a visit to the study
    ///
    /// # Returns
    /// * `Ok(StudyEvent)` - VisitAdded event
    /// * `Err(DomainError::AlreadyExists)` - If the uid is taken
    /// * `Err(DomainError::Validation)` - If the timeline would become invalid
    pub fn add_visit(&mut self, visit: StudyVisit) -> DomainResult<StudyEvent> {
        if self.visit(visit.uid()).is_some() {
            return Err(DomainError::already_exists(format!(
                "Study visit {} already exists",
                visit.uid()
            )));
        }

        let event = StudyEvent::VisitAdded {
            study_uid: self.uid,
            visit_uid: visit.uid(),
            epoch_uid: visit.epoch_uid(),
        };

        let mut visits = self.visits.clone();
        visits.push(visit);
        self.commit(self.epochs.clone(), visits)?;

        Ok(event)
    }

    /// Replaces the user-entered attributes of a visit
    pub fn edit_visit(&mut self, visit_uid: Uuid, input: NewStudyVisit) -> DomainResult<StudyEvent> {
        let index = self.visit_index(visit_uid)?;
        let edited = self.visits[index].edit(input)?;

        let mut visits = self.visits.clone();
        visits[index] = edited;
        self.commit(self.epochs.clone(), visits)?;

        Ok(StudyEvent::VisitEdited {
            study_uid: self.uid,
            visit_uid,
        })
    }

    /// Removes a visit no other visit depends on
    pub fn remove_visit(&mut self, visit_uid: Uuid) -> DomainResult<StudyEvent> {
        let index = self.visit_index(visit_uid)?;
        let dependant = self
            .visits
            .iter()
            .find(|v| v.referenced_visits().contains(&visit_uid));
        if let Some(dependant) = dependant {
            return Err(DomainError::business_logic(format!(
                "Study visit {} is referenced by visit {}",
                visit_uid,
                dependant.uid()
            )));
        }

        let mut visits = self.visits.clone();
        visits.remove(index);
        self.commit(self.epochs.clone(), visits)?;

        Ok(StudyEvent::VisitRemoved {
            study_uid: self.uid,
            visit_uid,
        })
    }

    /// Derives the current timeline
    pub fn timeline(&self) -> DomainResult<Timeline> {
        derive_timeline(&self.epochs, &self.visits)
    }

    // ===== Getters =====

    pub fn uid(&self) -> Uuid {
        self.uid
    }

    pub fn acronym(&self) -> &str {
        &self.acronym
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Records a successful write; called by repositories only
    pub fn increment_version(&mut self) {
        self.version += 1;
    }

    /// Epochs in study order
    pub fn epochs(&self) -> &[StudyEpoch] {
        &self.epochs
    }

    /// Visits in insertion order
    pub fn visits(&self) -> &[StudyVisit] {
        &self.visits
    }

    pub fn epoch(&self, uid: Uuid) -> Option<&StudyEpoch> {
        self.epochs.iter().find(|e| e.uid() == uid)
    }

    pub fn visit(&self, uid: Uuid) -> Option<&StudyVisit> {
        self.visits.iter().find(|v| v.uid() == uid)
    }

    fn epoch_index(&self, uid: Uuid) -> DomainResult<usize> {
        self.epochs
            .iter()
            .position(|e| e.uid() == uid)
            .ok_or_else(|| DomainError::not_found(format!("Study epoch not found: {}", uid)))
    }

    fn visit_index(&self, uid: Uuid) -> DomainResult<usize> {
        self.visits
            .iter()
            .position(|v| v.uid() == uid)
            .ok_or_else(|| DomainError::not_found(format!("Study visit not found: {}", uid)))
    }

    /// Replaces epochs and visits when they derive a valid timeline
    fn commit(&mut self, epochs: Vec<StudyEpoch>, visits: Vec<StudyVisit>) -> DomainResult<()> {
        derive_timeline(&epochs, &visits)?;
        self.epochs = epochs;
        self.visits = visits;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::study_epoch::{EpochSubtype, NewStudyEpoch};
    use crate::domain::study_visit::{TimeReference, TimeUnit, VisitClass, VisitTiming};

    fn study() -> Study {
        Study::new("TEST-01".to_string()).unwrap().0
    }

    fn epoch(subtype: EpochSubtype) -> StudyEpoch {
        StudyEpoch::new(NewStudyEpoch::of_subtype(subtype)).unwrap()
    }

    fn visit_at(epoch_uid: Uuid, day: i64) -> StudyVisit {
        StudyVisit::new(NewStudyVisit::scheduled(
            epoch_uid,
            VisitTiming::from_global_anchor(day, TimeUnit::Day),
        ))
        .unwrap()
    }

    #[test]
    fn create_study_with_valid_acronym() {
        let (study, events) = Study::new("  ABC-123 ".to_string()).unwrap();

        assert_eq!(study.acronym(), "ABC-123");
        assert!(study.epochs().is_empty());
        assert_eq!(events.len(), 1);
        match &events[0] {
            StudyEvent::Created { study_uid, acronym } => {
                assert_eq!(*study_uid, study.uid());
                assert_eq!(acronym, "ABC-123");
            }
            _ => panic!("Expected Created event"),
        }
    }

    #[test]
    fn create_study_with_blank_acronym_fails() {
        let result = Study::new("   ".to_string());
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn add_epoch_appends_by_default() {
        let mut study = study();
        let screening = epoch(EpochSubtype::Screening);
        let treatment = epoch(EpochSubtype::Treatment);

        study.add_epoch(screening.clone(), None).unwrap();
        let event = study.add_epoch(treatment.clone(), None).unwrap();

        assert_eq!(study.epochs()[1].uid(), treatment.uid());
        assert!(matches!(event, StudyEvent::EpochAdded { order: 2, .. }));
    }

    #[test]
    fn add_epoch_at_position_shifts_later_epochs() {
        let mut study = study();
        let treatment = epoch(EpochSubtype::Treatment);
        let screening = epoch(EpochSubtype::Screening);

        study.add_epoch(treatment.clone(), None).unwrap();
        study.add_epoch(screening.clone(), Some(1)).unwrap();

        assert_eq!(study.epochs()[0].uid(), screening.uid());
        assert_eq!(study.epochs()[1].uid(), treatment.uid());
    }

    #[test]
    fn add_epoch_out_of_range_fails() {
        let mut study = study();
        let result = study.add_epoch(epoch(EpochSubtype::Screening), Some(3));

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(study.epochs().is_empty());
    }

    #[test]
    fn add_same_epoch_twice_fails() {
        let mut study = study();
        let screening = epoch(EpochSubtype::Screening);
        study.add_epoch(screening.clone(), None).unwrap();

        let result = study.add_epoch(screening, None);
        assert!(matches!(result, Err(DomainError::AlreadyExists(_))));
    }

    #[test]
    fn edit_unknown_epoch_fails() {
        let mut study = study();
        let result = study.edit_epoch(Uuid::new_v4(), EpochEdit::default());

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[test]
    fn remove_epoch_with_visits_fails() {
        let mut study = study();
        let screening = epoch(EpochSubtype::Screening);
        study.add_epoch(screening.clone(), None).unwrap();
        study.add_visit(visit_at(screening.uid(), 0)).unwrap();

        let result = study.remove_epoch(screening.uid());
        assert!(matches!(result, Err(DomainError::BusinessLogic(_))));
        assert_eq!(study.epochs().len(), 1);
    }

    #[test]
    fn remove_empty_epoch() {
        let mut study = study();
        let screening = epoch(EpochSubtype::Screening);
        study.add_epoch(screening.clone(), None).unwrap();

        let event = study.remove_epoch(screening.uid()).unwrap();
        assert!(study.epochs().is_empty());
        assert_eq!(event.study_uid(), study.uid());
    }

    #[test]
    fn reorder_epoch_against_visit_times_fails() {
        let mut study = study();
        let screening = epoch(EpochSubtype::Screening);
        let treatment = epoch(EpochSubtype::Treatment);
        study.add_epoch(screening.clone(), None).unwrap();
        study.add_epoch(treatment.clone(), None).unwrap();
        study.add_visit(visit_at(screening.uid(), -7)).unwrap();
        study.add_visit(visit_at(treatment.uid(), 0)).unwrap();

        let result = study.reorder_epoch(treatment.uid(), 1);

        assert!(matches!(result, Err(DomainError::BusinessLogic(_))));
        assert_eq!(study.epochs()[0].uid(), screening.uid());
    }

    #[test]
    fn reorder_empty_epoch() {
        let mut study = study();
        let screening = epoch(EpochSubtype::Screening);
        let follow_up = epoch(EpochSubtype::FollowUp);
        study.add_epoch(screening.clone(), None).unwrap();
        study.add_epoch(follow_up.clone(), None).unwrap();

        let event = study.reorder_epoch(follow_up.uid(), 1).unwrap();

        assert_eq!(study.epochs()[0].uid(), follow_up.uid());
        assert!(matches!(
            event,
            StudyEvent::EpochReordered {
                old_order: 2,
                new_order: 1,
                ..
            }
        ));
    }

    #[test]
    fn add_visit_to_unknown_epoch_fails() {
        let mut study = study();
        let result = study.add_visit(visit_at(Uuid::new_v4(), 0));

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(study.visits().is_empty());
    }

    #[test]
    fn invalid_visit_leaves_study_unchanged() {
        let mut study = study();
        let treatment = epoch(EpochSubtype::Treatment);
        study.add_epoch(treatment.clone(), None).unwrap();
        study.add_visit(visit_at(treatment.uid(), 1)).unwrap();

        let result = study.add_visit(visit_at(treatment.uid(), 1));

        assert!(result.is_err());
        assert_eq!(study.visits().len(), 1);
    }

    #[test]
    fn edit_visit_moves_it_on_timeline() {
        let mut study = study();
        let treatment = epoch(EpochSubtype::Treatment);
        study.add_epoch(treatment.clone(), None).unwrap();
        let first = visit_at(treatment.uid(), 1);
        let second = visit_at(treatment.uid(), 8);
        study.add_visit(first.clone()).unwrap();
        study.add_visit(second.clone()).unwrap();

        study
            .edit_visit(
                first.uid(),
                NewStudyVisit::scheduled(
                    treatment.uid(),
                    VisitTiming::from_global_anchor(15, TimeUnit::Day),
                ),
            )
            .unwrap();

        let timeline = study.timeline().unwrap();
        assert_eq!(timeline.visits[0].uid, second.uid());
        assert_eq!(timeline.visits[1].uid, first.uid());
        assert_eq!(timeline.visits[1].visit_number, 2);
    }

    #[test]
    fn edit_unknown_visit_fails() {
        let mut study = study();
        let treatment = epoch(EpochSubtype::Treatment);
        study.add_epoch(treatment.clone(), None).unwrap();

        let result = study.edit_visit(
            Uuid::new_v4(),
            NewStudyVisit::of_class(treatment.uid(), VisitClass::NonVisit),
        );
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[test]
    fn remove_referenced_visit_fails() {
        let mut study = study();
        let treatment = epoch(EpochSubtype::Treatment);
        study.add_epoch(treatment.clone(), None).unwrap();
        let anchor = visit_at(treatment.uid(), 0);
        study.add_visit(anchor.clone()).unwrap();
        let relative = StudyVisit::new(NewStudyVisit::scheduled(
            treatment.uid(),
            VisitTiming::new(TimeReference::Visit { uid: anchor.uid() }, 2, TimeUnit::Day),
        ))
        .unwrap();
        study.add_visit(relative.clone()).unwrap();

        let result = study.remove_visit(anchor.uid());
        assert!(matches!(result, Err(DomainError::BusinessLogic(_))));

        study.remove_visit(relative.uid()).unwrap();
        study.remove_visit(anchor.uid()).unwrap();
        assert!(study.visits().is_empty());
    }

    #[test]
    fn mutations_touch_updated_at() {
        let mut study = study();
        let before = study.updated_at();
        study.add_epoch(epoch(EpochSubtype::Basic), None).unwrap();

        assert!(study.updated_at() >= before);
        assert_eq!(study.created_at(), before);
    }

    #[test]
    fn version_changes_only_when_written() {
        let mut study = study();
        assert_eq!(study.version(), 0);

        study.add_epoch(epoch(EpochSubtype::Basic), None).unwrap();
        assert_eq!(study.version(), 0);

        study.increment_version();
        assert_eq!(study.version(), 1);
    }
}
