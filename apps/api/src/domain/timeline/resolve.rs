use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::study_visit::{StudyVisit, TimeReference};

/// Resolves the absolute duration, in seconds from study time zero, of every
/// scheduled visit
///
/// A visit timed from another visit inherits that visit's absolute duration;
/// chains are followed to the global anchor. Dangling references, references
/// to unscheduled visits and cycles are rejected. Visits are resolved in
/// input order and chains are walked with an explicit stack, so chain length
/// is bounded by memory only.
pub(super) fn absolute_durations(
    visits: &[StudyVisit],
    by_uid: &HashMap<Uuid, &StudyVisit>,
) -> DomainResult<HashMap<Uuid, i64>> {
    let mut resolver = Resolver {
        visits: by_uid,
        resolved: HashMap::with_capacity(by_uid.len()),
    };

    for visit in visits {
        if visit.visit_class().is_scheduled() {
            resolver.resolve(visit.uid())?;
        }
    }

    Ok(resolver.resolved)
}

struct Resolver<'a> {
    visits: &'a HashMap<Uuid, &'a StudyVisit>,
    resolved: HashMap<Uuid, i64>,
}

impl Resolver<'_> {
    fn resolve(&mut self, root: Uuid) -> DomainResult<()> {
        // visits waiting for their reference, innermost last
        let mut path: Vec<Uuid> = vec![root];
        let mut on_path: HashSet<Uuid> = HashSet::from([root]);

        while let Some(&uid) = path.last() {
            if self.resolved.contains_key(&uid) {
                path.pop();
                on_path.remove(&uid);
                continue;
            }

            let visits = self.visits;
            let visit = visits[&uid];
            let timing = visit.timing().ok_or_else(|| {
                DomainError::validation(format!("Visit {} has no timing", uid))
            })?;

            let reference = match timing.reference {
                TimeReference::GlobalAnchor => None,
                TimeReference::SubvisitAnchor => {
                    let anchor = visit.subvisit_anchor().ok_or_else(|| {
                        DomainError::validation(format!(
                            "Visit {} is timed from its sub-visit anchor but has none",
                            uid
                        ))
                    })?;
                    Some(anchor)
                }
                TimeReference::Visit { uid: referenced } => Some(referenced),
            };

            let base = match reference {
                None => 0,
                Some(target) => {
                    self.check_reference(uid, target)?;
                    match self.resolved.get(&target) {
                        Some(seconds) => *seconds,
                        None if on_path.contains(&target) => {
                            return Err(cycle_error(&path, target));
                        }
                        None => {
                            path.push(target);
                            on_path.insert(target);
                            continue;
                        }
                    }
                }
            };

            let seconds = timing
                .value
                .checked_mul(timing.unit.seconds())
                .and_then(|offset| offset.checked_add(base))
                .ok_or_else(|| {
                    DomainError::validation(format!("Timing of visit {} is out of range", uid))
                })?;

            self.resolved.insert(uid, seconds);
            path.pop();
            on_path.remove(&uid);
        }

        Ok(())
    }

    fn check_reference(&self, from: Uuid, target: Uuid) -> DomainResult<()> {
        match self.visits.get(&target) {
            None => Err(DomainError::validation(format!(
                "Visit {} is timed from visit {} which does not exist",
                from, target
            ))),
            Some(visit) if !visit.visit_class().is_scheduled() => {
                Err(DomainError::validation(format!(
                    "Visit {} is timed from visit {} which is a {} without timing",
                    from,
                    target,
                    visit.visit_class()
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Names the visits of a cycle closing at `target`, in reference order
fn cycle_error(path: &[Uuid], target: Uuid) -> DomainError {
    let start = path.iter().position(|uid| *uid == target).unwrap_or(0);
    let cycle = path[start..]
        .iter()
        .chain(std::iter::once(&target))
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");
    DomainError::validation(format!("Visit timings form a cycle: {}", cycle))
}
