use serde::Serialize;
use uuid::Uuid;

use crate::domain::study_epoch::{EpochSubtype, EpochType};
use crate::domain::study_visit::{VisitClass, VisitContactMode, VisitSubclass};

/// A study visit with every derived scheduling property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedVisit {
    pub uid: Uuid,
    pub epoch_uid: Uuid,
    pub epoch_name: String,
    /// 1-based position on the timeline
    pub order: usize,
    pub visit_class: VisitClass,
    pub visit_subclass: VisitSubclass,
    pub visit_type: Option<String>,
    pub visit_number: u32,
    pub unique_visit_number: u32,
    pub visit_name: String,
    pub visit_short_name: String,
    pub special_visit_letter: Option<char>,
    /// Uid of the anchor visit of the sub-visit group this visit belongs to
    pub subvisit_group: Option<Uuid>,
    /// 0 for the group anchor, 1.. for additional sub-visits in time order
    pub subvisit_index: Option<u32>,
    pub absolute_duration_seconds: Option<i64>,
    pub study_duration_days: Option<i64>,
    pub study_day_number: Option<i64>,
    pub study_day_label: Option<String>,
    pub study_week_number: Option<i64>,
    pub study_week_label: Option<String>,
    pub earliest_study_day: Option<i64>,
    pub latest_study_day: Option<i64>,
    pub window_label: Option<String>,
    pub consecutive_visit_group: Option<String>,
    pub contact_mode: VisitContactMode,
    pub is_global_anchor: bool,
    pub is_soa_milestone: bool,
    pub show_visit: bool,
    pub description: Option<String>,
    pub start_rule: Option<String>,
    pub end_rule: Option<String>,
}

/// A study epoch with its derived name, order and extent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedEpoch {
    pub uid: Uuid,
    pub name: String,
    pub subtype: EpochSubtype,
    pub epoch_type: EpochType,
    /// 1-based position among the study's epochs
    pub order: usize,
    pub start_day: Option<i64>,
    pub end_day: Option<i64>,
    pub duration_days: Option<i64>,
    pub first_visit_uid: Option<Uuid>,
    pub visit_count: usize,
    pub description: Option<String>,
    pub start_rule: Option<String>,
    pub end_rule: Option<String>,
    pub color_hash: Option<String>,
}

/// The derived schedule of a study
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Timeline {
    pub epochs: Vec<DerivedEpoch>,
    pub visits: Vec<DerivedVisit>,
}

impl Timeline {
    pub fn visit(&self, uid: Uuid) -> Option<&DerivedVisit> {
        self.visits.iter().find(|visit| visit.uid == uid)
    }

    pub fn epoch(&self, uid: Uuid) -> Option<&DerivedEpoch> {
        self.epochs.iter().find(|epoch| epoch.uid == uid)
    }
}
