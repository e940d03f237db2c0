use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{
    TimeReference, VisitClass, VisitContactMode, VisitSubclass, VisitTiming, VisitWindow,
};
use crate::domain::errors::{DomainError, DomainResult};

/// User-entered attributes of a study visit
///
/// Input for [`StudyVisit::new`] and [`StudyVisit::edit`]; everything the
/// timeline derives (numbers, names, study days) is absent here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudyVisit {
    pub epoch_uid: Uuid,
    pub visit_class: VisitClass,
    #[serde(default)]
    pub visit_subclass: VisitSubclass,
    #[serde(default)]
    pub visit_type: Option<String>,
    #[serde(default)]
    pub timing: Option<VisitTiming>,
    #[serde(default)]
    pub window: Option<VisitWindow>,
    #[serde(default)]
    pub contact_mode: VisitContactMode,
    #[serde(default)]
    pub subvisit_anchor: Option<Uuid>,
    #[serde(default)]
    pub special_visit_anchor: Option<Uuid>,
    #[serde(default)]
    pub is_global_anchor: bool,
    #[serde(default)]
    pub is_soa_milestone: bool,
    #[serde(default = "default_show_visit")]
    pub show_visit: bool,
    #[serde(default)]
    pub consecutive_group: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_rule: Option<String>,
    #[serde(default)]
    pub end_rule: Option<String>,
}

fn default_show_visit() -> bool {
    true
}

impl NewStudyVisit {
    /// A plain scheduled visit in `epoch_uid` at `timing`
    pub fn scheduled(epoch_uid: Uuid, timing: VisitTiming) -> Self {
        Self::of_class(epoch_uid, VisitClass::SingleVisit).with_timing(timing)
    }

    /// A visit of `visit_class` with every optional attribute left empty
    pub fn of_class(epoch_uid: Uuid, visit_class: VisitClass) -> Self {
        Self {
            epoch_uid,
            visit_class,
            visit_subclass: VisitSubclass::SingleVisit,
            visit_type: None,
            timing: None,
            window: None,
            contact_mode: VisitContactMode::OnSiteVisit,
            subvisit_anchor: None,
            special_visit_anchor: None,
            is_global_anchor: false,
            is_soa_milestone: false,
            show_visit: true,
            consecutive_group: None,
            description: None,
            start_rule: None,
            end_rule: None,
        }
    }

    pub fn with_timing(mut self, timing: VisitTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_subclass(mut self, subclass: VisitSubclass) -> Self {
        self.visit_subclass = subclass;
        self
    }

    pub fn with_subvisit_anchor(mut self, anchor: Uuid) -> Self {
        self.visit_subclass = VisitSubclass::AdditionalSubvisitInGroupOfSubvisits;
        self.subvisit_anchor = Some(anchor);
        self
    }

    pub fn with_special_visit_anchor(mut self, anchor: Uuid) -> Self {
        self.special_visit_anchor = Some(anchor);
        self
    }

    pub fn with_window(mut self, window: VisitWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_consecutive_group(mut self, group: impl Into<String>) -> Self {
        self.consecutive_group = Some(group.into());
        self
    }

    pub fn as_global_anchor(mut self) -> Self {
        self.is_global_anchor = true;
        self
    }
}

/// A study visit as entered by the user
///
/// # Invariants
/// - Only `SINGLE_VISIT` visits carry a timing, and they always do
/// - Additional sub-visits name their group anchor; nothing else does
/// - Special visits name the visit they hang off; nothing else does
/// - The global anchor is a scheduled, non-additional visit at time zero
/// - A visit never references itself
///
/// Rules spanning several visits (anchor resolution, ordering, caps) are
/// enforced by the timeline derivation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyVisit {
    uid: Uuid,
    epoch_uid: Uuid,
    visit_class: VisitClass,
    visit_subclass: VisitSubclass,
    visit_type: Option<String>,
    timing: Option<VisitTiming>,
    window: Option<VisitWindow>,
    contact_mode: VisitContactMode,
    subvisit_anchor: Option<Uuid>,
    special_visit_anchor: Option<Uuid>,
    is_global_anchor: bool,
    is_soa_milestone: bool,
    show_visit: bool,
    consecutive_group: Option<String>,
    description: Option<String>,
    start_rule: Option<String>,
    end_rule: Option<String>,
}

impl StudyVisit {
    /// Creates a new study visit with a fresh uid
    ///
    /// # Example
    /// ```
    /// use clinical_mdr_api::domain::study_visit::value_objects::{TimeUnit, VisitTiming};
    /// use clinical_mdr_api::domain::study_visit::{NewStudyVisit, StudyVisit};
    /// use uuid::Uuid;
    ///
    /// let input = NewStudyVisit::scheduled(
    ///     Uuid::new_v4(),
    ///     VisitTiming::from_global_anchor(0, TimeUnit::Day),
    /// )
    /// .as_global_anchor();
    ///
    /// let visit = StudyVisit::new(input).expect("valid visit");
    /// assert!(visit.is_global_anchor());
    /// ```
    pub fn new(input: NewStudyVisit) -> DomainResult<Self> {
        Self::with_uid(Uuid::new_v4(), input)
    }

    /// Creates a study visit keeping a known uid
    pub fn with_uid(uid: Uuid, input: NewStudyVisit) -> DomainResult<Self> {
        validate(uid, &input)?;

        let consecutive_group = input
            .consecutive_group
            .map(|group| group.trim().to_string());

        Ok(Self {
            uid,
            epoch_uid: input.epoch_uid,
            visit_class: input.visit_class,
            visit_subclass: input.visit_subclass,
            visit_type: input.visit_type,
            timing: input.timing,
            window: input.window,
            contact_mode: input.contact_mode,
            subvisit_anchor: input.subvisit_anchor,
            special_visit_anchor: input.special_visit_anchor,
            is_global_anchor: input.is_global_anchor,
            is_soa_milestone: input.is_soa_milestone,
            show_visit: input.show_visit,
            consecutive_group,
            description: input.description,
            start_rule: input.start_rule,
            end_rule: input.end_rule,
        })
    }

    /// Replaces the user-entered attributes, keeping the uid
    pub fn edit(&self, input: NewStudyVisit) -> DomainResult<Self> {
        Self::with_uid(self.uid, input)
    }

    /// Visits this visit depends on for its position on the timeline
    pub fn referenced_visits(&self) -> Vec<Uuid> {
        let mut referenced = Vec::new();
        if let Some(TimeReference::Visit { uid }) = self.timing.map(|t| t.reference) {
            referenced.push(uid);
        }
        referenced.extend(self.subvisit_anchor);
        referenced.extend(self.special_visit_anchor);
        referenced
    }

    pub fn uid(&self) -> Uuid {
        self.uid
    }

    pub fn epoch_uid(&self) -> Uuid {
        self.epoch_uid
    }

    pub fn visit_class(&self) -> VisitClass {
        self.visit_class
    }

    pub fn visit_subclass(&self) -> VisitSubclass {
        self.visit_subclass
    }

    pub fn visit_type(&self) -> Option<&str> {
        self.visit_type.as_deref()
    }

    pub fn timing(&self) -> Option<VisitTiming> {
        self.timing
    }

    pub fn window(&self) -> Option<VisitWindow> {
        self.window
    }

    pub fn contact_mode(&self) -> VisitContactMode {
        self.contact_mode
    }

    pub fn subvisit_anchor(&self) -> Option<Uuid> {
        self.subvisit_anchor
    }

    pub fn special_visit_anchor(&self) -> Option<Uuid> {
        self.special_visit_anchor
    }

    pub fn is_global_anchor(&self) -> bool {
        self.is_global_anchor
    }

    pub fn is_soa_milestone(&self) -> bool {
        self.is_soa_milestone
    }

    pub fn show_visit(&self) -> bool {
        self.show_visit
    }

    pub fn consecutive_group(&self) -> Option<&str> {
        self.consecutive_group.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn start_rule(&self) -> Option<&str> {
        self.start_rule.as_deref()
    }

    pub fn end_rule(&self) -> Option<&str> {
        self.end_rule.as_deref()
    }
}

fn validate(uid: Uuid, input: &NewStudyVisit) -> DomainResult<()> {
    match input.visit_class {
        VisitClass::SingleVisit => validate_scheduled(input)?,
        VisitClass::SpecialVisit => {
            reject_timing(input)?;
            reject_subvisit_role(input)?;
            if input.special_visit_anchor.is_none() {
                return Err(DomainError::validation(
                    "A special visit must reference the visit it belongs to",
                ));
            }
        }
        VisitClass::UnscheduledVisit
        | VisitClass::NonVisit
        | VisitClass::EarlyDiscontinuationVisit => {
            reject_timing(input)?;
            reject_subvisit_role(input)?;
            if input.special_visit_anchor.is_some() {
                return Err(DomainError::validation(format!(
                    "A {} cannot reference a special visit anchor",
                    input.visit_class
                )));
            }
        }
    }

    if input.is_global_anchor {
        let at_time_zero = matches!(
            input.timing,
            Some(VisitTiming {
                reference: TimeReference::GlobalAnchor,
                value: 0,
                ..
            })
        );
        if !input.visit_class.is_scheduled() || input.visit_subclass.is_additional_subvisit() {
            return Err(DomainError::validation(
                "Only a scheduled visit outside a sub-visit group's tail can be the global anchor",
            ));
        }
        if !at_time_zero {
            return Err(DomainError::validation(
                "The global anchor visit must be timed 0 from the global anchor",
            ));
        }
    }

    let self_reference = matches!(
        input.timing.map(|t| t.reference),
        Some(TimeReference::Visit { uid: referenced }) if referenced == uid
    ) || input.subvisit_anchor == Some(uid)
        || input.special_visit_anchor == Some(uid);
    if self_reference {
        return Err(DomainError::validation("A visit cannot reference itself"));
    }

    if let Some(group) = &input.consecutive_group {
        if !input.visit_class.is_scheduled() {
            return Err(DomainError::validation(
                "Only scheduled visits can be part of a consecutive visit group",
            ));
        }
        if group.trim().is_empty() {
            return Err(DomainError::validation(
                "Consecutive visit group name cannot be empty",
            ));
        }
    }

    Ok(())
}

fn validate_scheduled(input: &NewStudyVisit) -> DomainResult<()> {
    let timing = input.timing.ok_or_else(|| {
        DomainError::validation("A scheduled visit requires a timing")
    })?;

    if input.special_visit_anchor.is_some() {
        return Err(DomainError::validation(
            "Only special visits can reference a special visit anchor",
        ));
    }

    if input.visit_subclass.is_additional_subvisit() {
        if input.subvisit_anchor.is_none() {
            return Err(DomainError::validation(
                "An additional sub-visit must reference its group anchor visit",
            ));
        }
    } else {
        if input.subvisit_anchor.is_some() {
            return Err(DomainError::validation(
                "Only additional sub-visits can reference a sub-visit anchor",
            ));
        }
        if timing.reference == TimeReference::SubvisitAnchor {
            return Err(DomainError::validation(
                "Only additional sub-visits can be timed from a sub-visit anchor",
            ));
        }
    }

    Ok(())
}

fn reject_timing(input: &NewStudyVisit) -> DomainResult<()> {
    if input.timing.is_some() {
        return Err(DomainError::validation(format!(
            "A {} cannot have a timing",
            input.visit_class
        )));
    }
    Ok(())
}

fn reject_subvisit_role(input: &NewStudyVisit) -> DomainResult<()> {
    if input.visit_subclass != VisitSubclass::SingleVisit || input.subvisit_anchor.is_some() {
        return Err(DomainError::validation(format!(
            "A {} cannot be part of a sub-visit group",
            input.visit_class
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::study_visit::value_objects::TimeUnit;

    fn day(value: i64) -> VisitTiming {
        VisitTiming::from_global_anchor(value, TimeUnit::Day)
    }

    #[test]
    fn create_scheduled_visit() {
        let epoch = Uuid::new_v4();
        let visit = StudyVisit::new(NewStudyVisit::scheduled(epoch, day(7))).unwrap();

        assert_eq!(visit.epoch_uid(), epoch);
        assert_eq!(visit.visit_class(), VisitClass::SingleVisit);
        assert_eq!(visit.timing(), Some(day(7)));
        assert!(visit.show_visit());
        assert!(!visit.is_global_anchor());
    }

    #[test]
    fn scheduled_visit_requires_timing() {
        let input = NewStudyVisit::of_class(Uuid::new_v4(), VisitClass::SingleVisit);
        let result = StudyVisit::new(input);

        assert!(matches!(result, Err(DomainError::Validation(m)) if m.contains("requires a timing")));
    }

    #[test]
    fn special_visit_cannot_have_timing() {
        let input = NewStudyVisit::of_class(Uuid::new_v4(), VisitClass::SpecialVisit)
            .with_special_visit_anchor(Uuid::new_v4())
            .with_timing(day(3));

        assert!(StudyVisit::new(input).is_err());
    }

    #[test]
    fn special_visit_requires_anchor() {
        let input = NewStudyVisit::of_class(Uuid::new_v4(), VisitClass::SpecialVisit);
        assert!(StudyVisit::new(input).is_err());
    }

    #[test]
    fn additional_subvisit_requires_anchor() {
        let input = NewStudyVisit::scheduled(Uuid::new_v4(), day(3))
            .with_subclass(VisitSubclass::AdditionalSubvisitInGroupOfSubvisits);

        assert!(StudyVisit::new(input).is_err());
    }

    #[test]
    fn only_additional_subvisits_time_from_subvisit_anchor() {
        let input = NewStudyVisit::scheduled(
            Uuid::new_v4(),
            VisitTiming::new(TimeReference::SubvisitAnchor, 1, TimeUnit::Day),
        );

        assert!(StudyVisit::new(input).is_err());
    }

    #[test]
    fn unscheduled_visit_cannot_be_in_subvisit_group() {
        let input = NewStudyVisit::of_class(Uuid::new_v4(), VisitClass::UnscheduledVisit)
            .with_subclass(VisitSubclass::AnchorVisitInGroupOfSubvisits);

        assert!(StudyVisit::new(input).is_err());
    }

    #[test]
    fn global_anchor_must_be_at_time_zero() {
        let input = NewStudyVisit::scheduled(Uuid::new_v4(), day(1)).as_global_anchor();
        let result = StudyVisit::new(input);

        assert!(matches!(result, Err(DomainError::Validation(m)) if m.contains("timed 0")));
    }

    #[test]
    fn non_visit_cannot_be_global_anchor() {
        let mut input = NewStudyVisit::of_class(Uuid::new_v4(), VisitClass::NonVisit);
        input.is_global_anchor = true;

        assert!(StudyVisit::new(input).is_err());
    }

    #[test]
    fn visit_cannot_reference_itself() {
        let uid = Uuid::new_v4();
        let input = NewStudyVisit::scheduled(
            Uuid::new_v4(),
            VisitTiming::new(TimeReference::Visit { uid }, 2, TimeUnit::Day),
        );

        let result = StudyVisit::with_uid(uid, input);
        assert!(matches!(result, Err(DomainError::Validation(m)) if m.contains("itself")));
    }

    #[test]
    fn blank_consecutive_group_rejected() {
        let input = NewStudyVisit::scheduled(Uuid::new_v4(), day(1)).with_consecutive_group("  ");
        assert!(StudyVisit::new(input).is_err());
    }

    #[test]
    fn special_visit_cannot_join_consecutive_group() {
        let input = NewStudyVisit::of_class(Uuid::new_v4(), VisitClass::SpecialVisit)
            .with_special_visit_anchor(Uuid::new_v4())
            .with_consecutive_group("A");

        assert!(StudyVisit::new(input).is_err());
    }

    #[test]
    fn consecutive_group_is_trimmed() {
        let input = NewStudyVisit::scheduled(Uuid::new_v4(), day(1)).with_consecutive_group(" A ");
        let visit = StudyVisit::new(input).unwrap();

        assert_eq!(visit.consecutive_group(), Some("A"));
    }

    #[test]
    fn edit_keeps_uid() {
        let epoch = Uuid::new_v4();
        let visit = StudyVisit::new(NewStudyVisit::scheduled(epoch, day(1))).unwrap();
        let edited = visit.edit(NewStudyVisit::scheduled(epoch, day(5))).unwrap();

        assert_eq!(edited.uid(), visit.uid());
        assert_eq!(edited.timing(), Some(day(5)));
    }

    #[test]
    fn referenced_visits_lists_every_dependency() {
        let epoch = Uuid::new_v4();
        let anchor = Uuid::new_v4();
        let input = NewStudyVisit::scheduled(
            epoch,
            VisitTiming::new(TimeReference::Visit { uid: anchor }, 1, TimeUnit::Day),
        )
        .with_subvisit_anchor(anchor);

        let visit = StudyVisit::new(input).unwrap();
        assert_eq!(visit.referenced_visits(), vec![anchor, anchor]);
    }

    #[test]
    fn new_visit_deserializes_with_defaults() {
        let epoch = Uuid::new_v4();
        let json = serde_json::json!({
            "epoch_uid": epoch,
            "visit_class": "SINGLE_VISIT",
            "timing": {
                "reference": {"type": "global_anchor"},
                "value": 14,
                "unit": "day"
            }
        });

        let input: NewStudyVisit = serde_json::from_value(json).unwrap();
        assert_eq!(input.visit_subclass, VisitSubclass::SingleVisit);
        assert_eq!(input.contact_mode, VisitContactMode::OnSiteVisit);
        assert!(input.show_visit);
        assert!(StudyVisit::new(input).is_ok());
    }
}
