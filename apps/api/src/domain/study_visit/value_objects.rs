use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Unit in which visit timings and windows are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    /// Length of one unit in seconds
    ///
    /// # Example
    /// ```
    /// use clinical_mdr_api::domain::study_visit::value_objects::TimeUnit;
    ///
    /// assert_eq!(TimeUnit::Day.seconds(), 86_400);
    /// assert_eq!(TimeUnit::Week.seconds(), 7 * TimeUnit::Day.seconds());
    /// ```
    pub fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3_600,
            TimeUnit::Day => SECONDS_PER_DAY,
            TimeUnit::Week => SECONDS_PER_WEEK,
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "minutes",
            TimeUnit::Hour => "hours",
            TimeUnit::Day => "days",
            TimeUnit::Week => "weeks",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Minute => write!(f, "minute"),
            TimeUnit::Hour => write!(f, "hour"),
            TimeUnit::Day => write!(f, "day"),
            TimeUnit::Week => write!(f, "week"),
        }
    }
}

/// Point a visit timing is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeReference {
    /// Study time zero, defined by the global anchor visit
    GlobalAnchor,
    /// The anchor visit of the visit's own sub-visit group
    SubvisitAnchor,
    /// Another scheduled visit
    Visit { uid: Uuid },
}

/// Timing of a scheduled visit relative to a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitTiming {
    pub reference: TimeReference,
    pub value: i64,
    pub unit: TimeUnit,
}

impl VisitTiming {
    pub fn new(reference: TimeReference, value: i64, unit: TimeUnit) -> Self {
        Self {
            reference,
            value,
            unit,
        }
    }

    /// Timing relative to study time zero
    pub fn from_global_anchor(value: i64, unit: TimeUnit) -> Self {
        Self::new(TimeReference::GlobalAnchor, value, unit)
    }
}

/// Allowed deviation around a visit's planned time
///
/// # Invariants
/// - `min <= 0 <= max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisitWindow {
    min: i64,
    max: i64,
    unit: TimeUnit,
}

impl VisitWindow {
    /// Creates a visit window
    ///
    /// # Example
    /// ```
    /// use clinical_mdr_api::domain::study_visit::value_objects::{TimeUnit, VisitWindow};
    ///
    /// let window = VisitWindow::new(-2, 3, TimeUnit::Day).expect("valid window");
    /// assert_eq!(window.label(), "-2/+3 days");
    /// assert!(VisitWindow::new(1, 3, TimeUnit::Day).is_err());
    /// ```
    pub fn new(min: i64, max: i64, unit: TimeUnit) -> DomainResult<Self> {
        if min > 0 {
            return Err(DomainError::validation(format!(
                "Visit window minimum must not be positive, got {}",
                min
            )));
        }
        if max < 0 {
            return Err(DomainError::validation(format!(
                "Visit window maximum must not be negative, got {}",
                max
            )));
        }
        Ok(Self { min, max, unit })
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Lower bound in seconds, `None` when it does not fit in an `i64`
    pub fn min_seconds(&self) -> Option<i64> {
        self.min.checked_mul(self.unit.seconds())
    }

    /// Upper bound in seconds, `None` when it does not fit in an `i64`
    pub fn max_seconds(&self) -> Option<i64> {
        self.max.checked_mul(self.unit.seconds())
    }

    /// Display form such as `-2/+2 days`
    pub fn label(&self) -> String {
        let min = if self.min == 0 {
            "0".to_string()
        } else {
            self.min.to_string()
        };
        format!("{}/+{} {}", min, self.max, self.unit.plural())
    }
}

impl<'de> Deserialize<'de> for VisitWindow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            min: i64,
            max: i64,
            unit: TimeUnit,
        }

        let raw = Raw::deserialize(deserializer)?;
        VisitWindow::new(raw.min, raw.max, raw.unit).map_err(serde::de::Error::custom)
    }
}

/// Class of a study visit
///
/// Only `SingleVisit` carries its own timing; the other classes are placed
/// on the timeline by rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitClass {
    SingleVisit,
    SpecialVisit,
    UnscheduledVisit,
    NonVisit,
    EarlyDiscontinuationVisit,
}

impl VisitClass {
    /// Whether visits of this class are positioned by their own timing
    pub fn is_scheduled(&self) -> bool {
        matches!(self, VisitClass::SingleVisit)
    }
}

impl fmt::Display for VisitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitClass::SingleVisit => write!(f, "single visit"),
            VisitClass::SpecialVisit => write!(f, "special visit"),
            VisitClass::UnscheduledVisit => write!(f, "unscheduled visit"),
            VisitClass::NonVisit => write!(f, "non-visit"),
            VisitClass::EarlyDiscontinuationVisit => write!(f, "early discontinuation visit"),
        }
    }
}

/// Role of a scheduled visit in a group of sub-visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VisitSubclass {
    #[default]
    #[serde(rename = "SINGLE_VISIT")]
    SingleVisit,
    #[serde(rename = "ANCHOR_VISIT_IN_GROUP_OF_SUBV")]
    AnchorVisitInGroupOfSubvisits,
    #[serde(rename = "ADDITIONAL_SUBVISIT_IN_A_GROUP_OF_SUBV")]
    AdditionalSubvisitInGroupOfSubvisits,
}

impl VisitSubclass {
    pub fn is_additional_subvisit(&self) -> bool {
        matches!(self, VisitSubclass::AdditionalSubvisitInGroupOfSubvisits)
    }

    pub fn is_subvisit_anchor(&self) -> bool {
        matches!(self, VisitSubclass::AnchorVisitInGroupOfSubvisits)
    }
}

/// How the subject is contacted for a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitContactMode {
    #[default]
    OnSiteVisit,
    PhoneContact,
    VirtualVisit,
}
