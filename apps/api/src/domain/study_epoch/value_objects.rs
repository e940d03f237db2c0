use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad category of a study epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpochType {
    PreTreatment,
    Treatment,
    PostTreatment,
    NoTreatment,
}

/// Epoch subtype chosen by the user
///
/// The subtype determines both the epoch type and the epoch's display name.
///
/// # Example
/// ```
/// use clinical_mdr_api::domain::study_epoch::{EpochSubtype, EpochType};
///
/// assert_eq!(EpochSubtype::RunIn.epoch_type(), EpochType::PreTreatment);
/// assert_eq!(EpochSubtype::FollowUp.label(), "Follow-up");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpochSubtype {
    Screening,
    RunIn,
    Treatment,
    Washout,
    FollowUp,
    Basic,
}

impl EpochSubtype {
    pub fn epoch_type(&self) -> EpochType {
        match self {
            EpochSubtype::Screening | EpochSubtype::RunIn => EpochType::PreTreatment,
            EpochSubtype::Treatment => EpochType::Treatment,
            EpochSubtype::FollowUp => EpochType::PostTreatment,
            EpochSubtype::Washout | EpochSubtype::Basic => EpochType::NoTreatment,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EpochSubtype::Screening => "Screening",
            EpochSubtype::RunIn => "Run-in",
            EpochSubtype::Treatment => "Treatment",
            EpochSubtype::Washout => "Washout",
            EpochSubtype::FollowUp => "Follow-up",
            EpochSubtype::Basic => "Basic",
        }
    }
}

impl fmt::Display for EpochSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_maps_to_type() {
        assert_eq!(EpochSubtype::Screening.epoch_type(), EpochType::PreTreatment);
        assert_eq!(EpochSubtype::Treatment.epoch_type(), EpochType::Treatment);
        assert_eq!(EpochSubtype::FollowUp.epoch_type(), EpochType::PostTreatment);
        assert_eq!(EpochSubtype::Washout.epoch_type(), EpochType::NoTreatment);
        assert_eq!(EpochSubtype::Basic.epoch_type(), EpochType::NoTreatment);
    }

    #[test]
    fn subtype_display() {
        assert_eq!(EpochSubtype::Screening.to_string(), "Screening");
        assert_eq!(EpochSubtype::RunIn.to_string(), "Run-in");
        assert_eq!(EpochSubtype::Washout.to_string(), "Washout");
    }

    #[test]
    fn subtype_serialization() {
        let json = serde_json::to_string(&EpochSubtype::FollowUp).unwrap();
        assert_eq!(json, "\"FOLLOW_UP\"");

        let subtype: EpochSubtype = serde_json::from_str("\"RUN_IN\"").unwrap();
        assert_eq!(subtype, EpochSubtype::RunIn);
    }
}
