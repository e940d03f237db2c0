use uuid::Uuid;

/// Domain events that occur within the Study aggregate
///
/// Every successful mutation of a study's epochs or visits produces one
/// event; the API layer logs them.
///
/// # Example
/// ```
/// use clinical_mdr_api::domain::study::events::StudyEvent;
/// use uuid::Uuid;
///
/// let study_uid = Uuid::new_v4();
/// let event = StudyEvent::VisitRemoved {
///     study_uid,
///     visit_uid: Uuid::new_v4(),
/// };
/// assert_eq!(event.study_uid(), study_uid);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyEvent {
    /// Fired when a study is created
    Created {
        study_uid: Uuid,
        acronym: String,
    },
    EpochAdded {
        study_uid: Uuid,
        epoch_uid: Uuid,
        /// 1-based position of the new epoch
        order: usize,
    },
    EpochEdited {
        study_uid: Uuid,
        epoch_uid: Uuid,
    },
    /// Fired when an epoch moves to another position
    EpochReordered {
        study_uid: Uuid,
        epoch_uid: Uuid,
        old_order: usize,
        new_order: usize,
    },
    EpochRemoved {
        study_uid: Uuid,
        epoch_uid: Uuid,
    },
    VisitAdded {
        study_uid: Uuid,
        visit_uid: Uuid,
        epoch_uid: Uuid,
    },
    VisitEdited {
        study_uid: Uuid,
        visit_uid: Uuid,
    },
    VisitRemoved {
        study_uid: Uuid,
        visit_uid: Uuid,
    },
}

impl StudyEvent {
    /// Returns the study_uid for this event
    pub fn study_uid(&self) -> Uuid {
        match self {
            StudyEvent::Created { study_uid, .. }
            | StudyEvent::EpochAdded { study_uid, .. }
            | StudyEvent::EpochEdited { study_uid, .. }
            | StudyEvent::EpochReordered { study_uid, .. }
            | StudyEvent::EpochRemoved { study_uid, .. }
            | StudyEvent::VisitAdded { study_uid, .. }
            | StudyEvent::VisitEdited { study_uid, .. }
            | StudyEvent::VisitRemoved { study_uid, .. } => *study_uid,
        }
    }

    /// Short name of the event, used as a log field
    pub fn name(&self) -> &'static str {
        match self {
            StudyEvent::Created { .. } => "study_created",
            StudyEvent::EpochAdded { .. } => "epoch_added",
            StudyEvent::EpochEdited { .. } => "epoch_edited",
            StudyEvent::EpochReordered { .. } => "epoch_reordered",
            StudyEvent::EpochRemoved { .. } => "epoch_removed",
            StudyEvent::VisitAdded { .. } => "visit_added",
            StudyEvent::VisitEdited { .. } => "visit_edited",
            StudyEvent::VisitRemoved { .. } => "visit_removed",
        }
    }
}
