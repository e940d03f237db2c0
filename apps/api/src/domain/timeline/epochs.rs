use std::collections::HashMap;
use uuid::Uuid;

use super::model::{DerivedEpoch, DerivedVisit};
use super::study_time::day_number_from_days;
use crate::domain::study_epoch::{EpochSubtype, StudyEpoch};

/// Display names of the epochs, keyed by uid
///
/// An epoch is named after its subtype; when a subtype occurs more than once
/// every occurrence is numbered in epoch order (`Treatment 1`, `Treatment 2`).
pub(super) fn epoch_names(epochs: &[StudyEpoch]) -> HashMap<Uuid, String> {
    let mut occurrences: HashMap<EpochSubtype, usize> = HashMap::new();
    for epoch in epochs {
        *occurrences.entry(epoch.subtype()).or_default() += 1;
    }

    let mut seen: HashMap<EpochSubtype, usize> = HashMap::new();
    epochs
        .iter()
        .map(|epoch| {
            let subtype = epoch.subtype();
            let name = if occurrences[&subtype] > 1 {
                let index = seen.entry(subtype).or_default();
                *index += 1;
                format!("{} {}", subtype.label(), index)
            } else {
                subtype.label().to_string()
            };
            (epoch.uid(), name)
        })
        .collect()
}

/// Derives name, order and extent of every epoch from the ordered visits
///
/// Start day is the study day of the epoch's first scheduled visit. An epoch
/// lasts until the next epoch that has scheduled visits starts; the last one
/// ends on the day of its last scheduled visit.
pub(super) fn derive_epochs(
    epochs: &[StudyEpoch],
    names: &HashMap<Uuid, String>,
    visits: &[DerivedVisit],
) -> Vec<DerivedEpoch> {
    let extents: Vec<Option<Extent>> = epochs
        .iter()
        .map(|epoch| Extent::of(epoch.uid(), visits))
        .collect();

    epochs
        .iter()
        .enumerate()
        .map(|(index, epoch)| {
            let extent = extents[index];
            let next_start = extents[index + 1..]
                .iter()
                .flatten()
                .map(|next| next.first_days)
                .next();

            let (start_day, end_day, duration_days) = match extent {
                Some(extent) => {
                    let duration = match next_start {
                        Some(next) => next - extent.first_days,
                        None => extent.last_days - extent.first_days + 1,
                    };
                    let end_days = (extent.first_days + duration - 1).max(extent.first_days);
                    (
                        Some(day_number_from_days(extent.first_days)),
                        Some(day_number_from_days(end_days)),
                        Some(duration),
                    )
                }
                None => (None, None, None),
            };

            DerivedEpoch {
                uid: epoch.uid(),
                name: names[&epoch.uid()].clone(),
                subtype: epoch.subtype(),
                epoch_type: epoch.epoch_type(),
                order: index + 1,
                start_day,
                end_day,
                duration_days,
                first_visit_uid: extent.map(|extent| extent.first_visit),
                visit_count: visits
                    .iter()
                    .filter(|visit| visit.epoch_uid == epoch.uid())
                    .count(),
                description: epoch.description().map(str::to_string),
                start_rule: epoch.start_rule().map(str::to_string),
                end_rule: epoch.end_rule().map(str::to_string),
                color_hash: epoch.color_hash().map(str::to_string),
            }
        })
        .collect()
}

/// First and last scheduled visit of an epoch, in study duration days
#[derive(Debug, Clone, Copy)]
struct Extent {
    first_visit: Uuid,
    first_days: i64,
    last_days: i64,
}

impl Extent {
    fn of(epoch_uid: Uuid, visits: &[DerivedVisit]) -> Option<Self> {
        let mut timed = visits
            .iter()
            .filter(|visit| visit.epoch_uid == epoch_uid)
            .filter_map(|visit| visit.study_duration_days.map(|days| (visit.uid, days)));

        let (first_visit, first_days) = timed.next()?;
        let last_days = timed.last().map_or(first_days, |(_, days)| days);

        Some(Self {
            first_visit,
            first_days,
            last_days,
        })
    }
}
