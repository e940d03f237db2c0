use std::collections::HashMap;
use uuid::Uuid;

use super::epochs::{derive_epochs, epoch_names};
use super::model::{DerivedVisit, Timeline};
use super::resolve::absolute_durations;
use super::study_time::{
    day_label, study_day_number, study_duration_days, study_week_number, week_label,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::study_epoch::StudyEpoch;
use crate::domain::study_visit::{StudyVisit, VisitClass};

/// Visit number reserved for the unscheduled visit
pub const UNSCHEDULED_VISIT_NUMBER: u32 = 29_500;
/// Visit number reserved for the non-visit
pub const NON_VISIT_NUMBER: u32 = 29_999;
/// Highest consecutive visit number; `n * 100 + 99` must stay below the reserved range
pub const MAX_VISIT_NUMBER: u32 = (UNSCHEDULED_VISIT_NUMBER - 1) / 100;
/// Letters handed out to the special visits of one anchor visit
pub const SPECIAL_VISIT_LETTERS: [char; 9] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I'];
/// Additional sub-visits allowed in one group
pub const MAX_ADDITIONAL_SUBVISITS: usize = 9;

/// Derives the timeline of a study from its epochs and visits
///
/// Epochs are given in study order, visits in insertion order. The result
/// lists visits in timeline order with numbering, names, study days and
/// windows filled in, and every epoch with its derived extent.
///
/// # Errors
/// Returns `DomainError::Validation` when the visits cannot be laid out on a
/// single consistent timeline.
///
/// # Example
/// ```
/// use clinical_mdr_api::domain::study_epoch::{EpochSubtype, NewStudyEpoch, StudyEpoch};
/// use clinical_mdr_api::domain::study_visit::{NewStudyVisit, StudyVisit, TimeUnit, VisitTiming};
/// use clinical_mdr_api::domain::timeline::derive_timeline;
///
/// let epoch = StudyEpoch::new(NewStudyEpoch::of_subtype(EpochSubtype::Treatment)).unwrap();
/// let visit = StudyVisit::new(
///     NewStudyVisit::scheduled(epoch.uid(), VisitTiming::from_global_anchor(0, TimeUnit::Day))
///         .as_global_anchor(),
/// )
/// .unwrap();
///
/// let timeline = derive_timeline(&[epoch], &[visit]).unwrap();
/// assert_eq!(timeline.visits[0].visit_short_name, "V1");
/// assert_eq!(timeline.visits[0].study_day_number, Some(1));
/// ```
pub fn derive_timeline(epochs: &[StudyEpoch], visits: &[StudyVisit]) -> DomainResult<Timeline> {
    let mut epoch_order: HashMap<Uuid, usize> = HashMap::with_capacity(epochs.len());
    for (index, epoch) in epochs.iter().enumerate() {
        if epoch_order.insert(epoch.uid(), index).is_some() {
            return Err(DomainError::validation(format!(
                "Epoch {} is defined more than once",
                epoch.uid()
            )));
        }
    }

    let mut by_uid: HashMap<Uuid, &StudyVisit> = HashMap::with_capacity(visits.len());
    for visit in visits {
        if !epoch_order.contains_key(&visit.epoch_uid()) {
            return Err(DomainError::validation(format!(
                "Visit {} belongs to epoch {} which does not exist",
                visit.uid(),
                visit.epoch_uid()
            )));
        }
        if by_uid.insert(visit.uid(), visit).is_some() {
            return Err(DomainError::validation(format!(
                "Visit {} is defined more than once",
                visit.uid()
            )));
        }
    }

    let global_anchors = visits.iter().filter(|v| v.is_global_anchor()).count();
    if global_anchors > 1 {
        return Err(DomainError::validation(format!(
            "Only one global anchor visit is allowed, found {}",
            global_anchors
        )));
    }

    let durations = absolute_durations(visits, &by_uid)?;
    let scheduled = order_scheduled(visits, &durations, &epoch_order)?;
    let groups = subvisit_groups(visits, &by_uid, &scheduled)?;
    let specials = special_visits(visits, &by_uid)?;
    let placed = place_visits(visits, &scheduled, &specials)?;

    let names = epoch_names(epochs);
    let mut numbering = Numbering::default();
    let mut derived = Vec::with_capacity(placed.len());

    for (index, visit) in placed.iter().enumerate() {
        let seconds = durations.get(&visit.uid()).copied();
        let number = numbering.assign(visit, seconds, &groups, &specials)?;
        derived.push(derive_visit(
            visit,
            index + 1,
            seconds,
            number,
            names[&visit.epoch_uid()].clone(),
        )?);
    }

    apply_consecutive_groups(&placed, &mut derived)?;

    Ok(Timeline {
        epochs: derive_epochs(epochs, &names, &derived),
        visits: derived,
    })
}

/// Scheduled visits sorted by absolute duration
///
/// Rejects visits sharing the same point in time and visits that would put
/// a later epoch before an earlier one.
fn order_scheduled<'a>(
    visits: &'a [StudyVisit],
    durations: &HashMap<Uuid, i64>,
    epoch_order: &HashMap<Uuid, usize>,
) -> DomainResult<Vec<&'a StudyVisit>> {
    let mut scheduled: Vec<&StudyVisit> = visits
        .iter()
        .filter(|visit| visit.visit_class().is_scheduled())
        .collect();
    scheduled.sort_by_key(|visit| durations[&visit.uid()]);

    for pair in scheduled.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        if durations[&earlier.uid()] == durations[&later.uid()] {
            return Err(DomainError::validation(format!(
                "Visits {} and {} are scheduled at the same time",
                earlier.uid(),
                later.uid()
            )));
        }
        if epoch_order[&later.epoch_uid()] < epoch_order[&earlier.epoch_uid()] {
            return Err(DomainError::validation(format!(
                "Visit {} is scheduled after visit {} but belongs to an earlier epoch",
                later.uid(),
                earlier.uid()
            )));
        }
    }

    Ok(scheduled)
}

/// Additional sub-visits of every group anchor, in time order
fn subvisit_groups(
    visits: &[StudyVisit],
    by_uid: &HashMap<Uuid, &StudyVisit>,
    scheduled: &[&StudyVisit],
) -> DomainResult<HashMap<Uuid, Vec<Uuid>>> {
    let position: HashMap<Uuid, usize> = scheduled
        .iter()
        .enumerate()
        .map(|(index, visit)| (visit.uid(), index))
        .collect();

    let mut groups: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for visit in visits {
        if visit.visit_subclass().is_subvisit_anchor() {
            groups.entry(visit.uid()).or_default();
        }

        let Some(anchor_uid) = visit.subvisit_anchor() else {
            continue;
        };
        let anchor = by_uid.get(&anchor_uid).ok_or_else(|| {
            DomainError::validation(format!(
                "Sub-visit {} references anchor visit {} which does not exist",
                visit.uid(),
                anchor_uid
            ))
        })?;
        if !anchor.visit_subclass().is_subvisit_anchor() {
            return Err(DomainError::validation(format!(
                "Visit {} is not the anchor of a sub-visit group",
                anchor_uid
            )));
        }
        if anchor.epoch_uid() != visit.epoch_uid() {
            return Err(DomainError::validation(format!(
                "Sub-visit {} cannot cross the epoch boundary of its anchor visit {}",
                visit.uid(),
                anchor_uid
            )));
        }
        if position[&visit.uid()] < position[&anchor_uid] {
            return Err(DomainError::validation(format!(
                "Sub-visit {} must be scheduled after its anchor visit {}",
                visit.uid(),
                anchor_uid
            )));
        }
        groups.entry(anchor_uid).or_default().push(visit.uid());
    }

    for (anchor, members) in groups.iter_mut() {
        if members.len() > MAX_ADDITIONAL_SUBVISITS {
            return Err(DomainError::validation(format!(
                "Sub-visit group of visit {} exceeds {} additional sub-visits",
                anchor, MAX_ADDITIONAL_SUBVISITS
            )));
        }
        members.sort_by_key(|uid| position[uid]);

        if let Some(last) = members.last() {
            let intruder = scheduled[position[anchor]..=position[last]]
                .iter()
                .find(|visit| visit.uid() != *anchor && visit.subvisit_anchor() != Some(*anchor));
            if let Some(intruder) = intruder {
                return Err(DomainError::validation(format!(
                    "Visit {} falls inside the sub-visit group of visit {}",
                    intruder.uid(),
                    anchor
                )));
            }
        }
    }

    Ok(groups)
}

/// Special visits of every anchor visit with their letters, in insertion order
fn special_visits<'a>(
    visits: &'a [StudyVisit],
    by_uid: &HashMap<Uuid, &StudyVisit>,
) -> DomainResult<HashMap<Uuid, Vec<(&'a StudyVisit, char)>>> {
    let mut specials: HashMap<Uuid, Vec<(&StudyVisit, char)>> = HashMap::new();

    for visit in visits {
        let Some(anchor_uid) = visit.special_visit_anchor() else {
            continue;
        };
        let anchor = by_uid.get(&anchor_uid).ok_or_else(|| {
            DomainError::validation(format!(
                "Special visit {} references visit {} which does not exist",
                visit.uid(),
                anchor_uid
            ))
        })?;
        if !anchor.visit_class().is_scheduled() {
            return Err(DomainError::validation(format!(
                "Special visit {} must reference a scheduled visit, not a {}",
                visit.uid(),
                anchor.visit_class()
            )));
        }
        if anchor.epoch_uid() != visit.epoch_uid() {
            return Err(DomainError::validation(format!(
                "Special visit {} must be in the same epoch as visit {}",
                visit.uid(),
                anchor_uid
            )));
        }

        let taken = specials.entry(anchor_uid).or_default();
        let letter = SPECIAL_VISIT_LETTERS.get(taken.len()).ok_or_else(|| {
            DomainError::validation(format!(
                "Visit {} already has {} special visits",
                anchor_uid,
                SPECIAL_VISIT_LETTERS.len()
            ))
        })?;
        taken.push((visit, *letter));
    }

    Ok(specials)
}

/// Lays out every visit in timeline order
///
/// Special visits follow their anchor, an early discontinuation visit closes
/// its epoch, unscheduled and non-visits come last.
fn place_visits<'a>(
    visits: &'a [StudyVisit],
    scheduled: &[&'a StudyVisit],
    specials: &HashMap<Uuid, Vec<(&'a StudyVisit, char)>>,
) -> DomainResult<Vec<&'a StudyVisit>> {
    let mut discontinuation: HashMap<Uuid, &StudyVisit> = HashMap::new();
    let mut unscheduled: Option<&StudyVisit> = None;
    let mut non_visit: Option<&StudyVisit> = None;

    for visit in visits {
        match visit.visit_class() {
            VisitClass::EarlyDiscontinuationVisit => {
                if discontinuation.insert(visit.epoch_uid(), visit).is_some() {
                    return Err(DomainError::validation(format!(
                        "Epoch {} already has an early discontinuation visit",
                        visit.epoch_uid()
                    )));
                }
                if !scheduled.iter().any(|s| s.epoch_uid() == visit.epoch_uid()) {
                    return Err(DomainError::validation(format!(
                        "Early discontinuation visit {} requires a scheduled visit in its epoch",
                        visit.uid()
                    )));
                }
            }
            VisitClass::UnscheduledVisit => {
                if unscheduled.replace(visit).is_some() {
                    return Err(DomainError::validation(
                        "Only one unscheduled visit is allowed per study",
                    ));
                }
            }
            VisitClass::NonVisit => {
                if non_visit.replace(visit).is_some() {
                    return Err(DomainError::validation(
                        "Only one non-visit is allowed per study",
                    ));
                }
            }
            VisitClass::SingleVisit | VisitClass::SpecialVisit => {}
        }
    }

    let mut placed = Vec::with_capacity(visits.len());
    for (index, visit) in scheduled.iter().enumerate() {
        placed.push(*visit);
        if let Some(attached) = specials.get(&visit.uid()) {
            placed.extend(attached.iter().map(|(special, _)| *special));
        }

        let closes_epoch = scheduled
            .get(index + 1)
            .map_or(true, |next| next.epoch_uid() != visit.epoch_uid());
        if closes_epoch {
            if let Some(edv) = discontinuation.get(&visit.epoch_uid()) {
                placed.push(*edv);
            }
        }
    }
    placed.extend(unscheduled);
    placed.extend(non_visit);

    Ok(placed)
}

#[derive(Debug, Clone)]
struct VisitNumber {
    visit_number: u32,
    unique_visit_number: u32,
    visit_name: String,
    short_name: String,
    special_letter: Option<char>,
    subvisit_group: Option<Uuid>,
    subvisit_index: Option<u32>,
}

/// Running state of the visit numbering along the timeline
#[derive(Debug, Default)]
struct Numbering {
    counter: u32,
    assigned: HashMap<Uuid, VisitNumber>,
}

impl Numbering {
    fn assign(
        &mut self,
        visit: &StudyVisit,
        seconds: Option<i64>,
        groups: &HashMap<Uuid, Vec<Uuid>>,
        specials: &HashMap<Uuid, Vec<(&StudyVisit, char)>>,
    ) -> DomainResult<VisitNumber> {
        let number = match visit.visit_class() {
            VisitClass::SingleVisit => self.scheduled(visit, seconds, groups)?,
            VisitClass::SpecialVisit => self.special(visit, specials)?,
            VisitClass::EarlyDiscontinuationVisit => {
                let n = self.next()?;
                plain(n)
            }
            VisitClass::UnscheduledVisit => {
                reserved(UNSCHEDULED_VISIT_NUMBER, "Unscheduled Visit", "UNSCHED")
            }
            VisitClass::NonVisit => reserved(NON_VISIT_NUMBER, "Non-visit", "NONVISIT"),
        };

        self.assigned.insert(visit.uid(), number.clone());
        Ok(number)
    }

    fn next(&mut self) -> DomainResult<u32> {
        if self.counter >= MAX_VISIT_NUMBER {
            return Err(DomainError::validation(format!(
                "A study cannot have more than {} numbered visits",
                MAX_VISIT_NUMBER
            )));
        }
        self.counter += 1;
        Ok(self.counter)
    }

    fn scheduled(
        &mut self,
        visit: &StudyVisit,
        seconds: Option<i64>,
        groups: &HashMap<Uuid, Vec<Uuid>>,
    ) -> DomainResult<VisitNumber> {
        let day = seconds.map(study_day_number).unwrap_or_default();

        if let Some(anchor_uid) = visit.subvisit_anchor() {
            let anchor = self.assigned.get(&anchor_uid).ok_or_else(|| {
                DomainError::validation(format!(
                    "Sub-visit {} is placed before its anchor visit {}",
                    visit.uid(),
                    anchor_uid
                ))
            })?;
            let index = groups
                .get(&anchor_uid)
                .and_then(|members| members.iter().position(|uid| *uid == visit.uid()))
                .map(|position| position as u32 + 1)
                .unwrap_or_default();
            let n = anchor.visit_number;

            return Ok(VisitNumber {
                visit_number: n,
                unique_visit_number: n * 100 + 10 * index,
                visit_name: format!("Visit {}", n),
                short_name: format!("V{}D{}", n, day),
                special_letter: None,
                subvisit_group: Some(anchor_uid),
                subvisit_index: Some(index),
            });
        }

        let n = self.next()?;
        if visit.visit_subclass().is_subvisit_anchor() {
            return Ok(VisitNumber {
                short_name: format!("V{}D{}", n, day),
                subvisit_group: Some(visit.uid()),
                subvisit_index: Some(0),
                ..plain(n)
            });
        }
        Ok(plain(n))
    }

    fn special(
        &self,
        visit: &StudyVisit,
        specials: &HashMap<Uuid, Vec<(&StudyVisit, char)>>,
    ) -> DomainResult<VisitNumber> {
        let anchor_uid = visit.special_visit_anchor().ok_or_else(|| {
            DomainError::validation(format!("Special visit {} has no anchor", visit.uid()))
        })?;
        let anchor = self.assigned.get(&anchor_uid).ok_or_else(|| {
            DomainError::validation(format!(
                "Special visit {} is placed before its anchor visit {}",
                visit.uid(),
                anchor_uid
            ))
        })?;
        let (position, letter) = specials
            .get(&anchor_uid)
            .and_then(|attached| {
                attached
                    .iter()
                    .position(|(special, _)| special.uid() == visit.uid())
                    .map(|position| (position, attached[position].1))
            })
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "Special visit {} has no letter assigned",
                    visit.uid()
                ))
            })?;

        Ok(VisitNumber {
            visit_number: anchor.visit_number,
            unique_visit_number: anchor.unique_visit_number + position as u32 + 1,
            visit_name: format!("Visit {}{}", anchor.visit_number, letter),
            short_name: format!("{}{}", anchor.short_name, letter),
            special_letter: Some(letter),
            subvisit_group: None,
            subvisit_index: None,
        })
    }
}

fn plain(n: u32) -> VisitNumber {
    VisitNumber {
        visit_number: n,
        unique_visit_number: n * 100,
        visit_name: format!("Visit {}", n),
        short_name: format!("V{}", n),
        special_letter: None,
        subvisit_group: None,
        subvisit_index: None,
    }
}

fn reserved(number: u32, name: &str, short_name: &str) -> VisitNumber {
    VisitNumber {
        visit_number: number,
        unique_visit_number: number,
        visit_name: name.to_string(),
        short_name: short_name.to_string(),
        special_letter: None,
        subvisit_group: None,
        subvisit_index: None,
    }
}

fn derive_visit(
    visit: &StudyVisit,
    order: usize,
    seconds: Option<i64>,
    number: VisitNumber,
    epoch_name: String,
) -> DomainResult<DerivedVisit> {
    let study_day = seconds.map(study_day_number);
    let study_week = seconds.map(study_week_number);
    let window = visit.window();

    let (earliest_study_day, latest_study_day) = match (seconds, window) {
        (Some(seconds), Some(window)) => {
            let bound = |offset: Option<i64>| {
                offset
                    .and_then(|offset| seconds.checked_add(offset))
                    .map(study_day_number)
                    .ok_or_else(|| {
                        DomainError::validation(format!(
                            "Window of visit {} is out of range",
                            visit.uid()
                        ))
                    })
            };
            (
                Some(bound(window.min_seconds())?),
                Some(bound(window.max_seconds())?),
            )
        }
        _ => (None, None),
    };

    Ok(DerivedVisit {
        uid: visit.uid(),
        epoch_uid: visit.epoch_uid(),
        epoch_name,
        order,
        visit_class: visit.visit_class(),
        visit_subclass: visit.visit_subclass(),
        visit_type: visit.visit_type().map(str::to_string),
        visit_number: number.visit_number,
        unique_visit_number: number.unique_visit_number,
        visit_name: number.visit_name,
        visit_short_name: number.short_name,
        special_visit_letter: number.special_letter,
        subvisit_group: number.subvisit_group,
        subvisit_index: number.subvisit_index,
        absolute_duration_seconds: seconds,
        study_duration_days: seconds.map(study_duration_days),
        study_day_number: study_day,
        study_day_label: study_day.map(day_label),
        study_week_number: study_week,
        study_week_label: study_week.map(week_label),
        earliest_study_day,
        latest_study_day,
        window_label: window.map(|window| window.label()),
        consecutive_visit_group: None,
        contact_mode: visit.contact_mode(),
        is_global_anchor: visit.is_global_anchor(),
        is_soa_milestone: visit.is_soa_milestone(),
        show_visit: visit.show_visit(),
        description: visit.description().map(str::to_string),
        start_rule: visit.start_rule().map(str::to_string),
        end_rule: visit.end_rule().map(str::to_string),
    })
}

/// Fills in the display value of consecutive visit groups
///
/// Members of a group must be adjacent among the scheduled visits; the group
/// is displayed as `first-last` by short name.
fn apply_consecutive_groups(
    placed: &[&StudyVisit],
    derived: &mut [DerivedVisit],
) -> DomainResult<()> {
    // group name -> (rank among scheduled visits, timeline index)
    let mut members: HashMap<&str, Vec<(usize, usize)>> = HashMap::new();
    let mut rank = 0;
    for (index, visit) in placed.iter().enumerate() {
        if !visit.visit_class().is_scheduled() {
            continue;
        }
        if let Some(group) = visit.consecutive_group() {
            members.entry(group).or_default().push((rank, index));
        }
        rank += 1;
    }

    for (group, entries) in members {
        let (first_rank, first_index) = entries[0];
        let (last_rank, last_index) = entries[entries.len() - 1];
        if last_rank - first_rank + 1 != entries.len() {
            return Err(DomainError::validation(format!(
                "Visits of consecutive visit group {} are not consecutive",
                group
            )));
        }

        let label = if first_index == last_index {
            derived[first_index].visit_short_name.clone()
        } else {
            format!(
                "{}-{}",
                derived[first_index].visit_short_name, derived[last_index].visit_short_name
            )
        };
        for (_, index) in entries {
            derived[index].consecutive_visit_group = Some(label.clone());
        }
    }

    Ok(())
}
