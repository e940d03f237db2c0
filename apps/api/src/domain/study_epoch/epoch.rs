use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{EpochSubtype, EpochType};
use crate::domain::errors::{DomainError, DomainResult};

/// User-entered attributes of a new study epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudyEpoch {
    pub subtype: EpochSubtype,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_rule: Option<String>,
    #[serde(default)]
    pub end_rule: Option<String>,
    #[serde(default)]
    pub color_hash: Option<String>,
}

impl NewStudyEpoch {
    pub fn of_subtype(subtype: EpochSubtype) -> Self {
        Self {
            subtype,
            description: None,
            start_rule: None,
            end_rule: None,
            color_hash: None,
        }
    }
}

/// Partial update of a study epoch; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpochEdit {
    #[serde(default)]
    pub subtype: Option<EpochSubtype>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_rule: Option<String>,
    #[serde(default)]
    pub end_rule: Option<String>,
    #[serde(default)]
    pub color_hash: Option<String>,
}

/// A study epoch
///
/// Epochs have no timing of their own: their order is their position in
/// the study, and their start day and duration follow from the visits
/// allocated to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyEpoch {
    uid: Uuid,
    subtype: EpochSubtype,
    description: Option<String>,
    start_rule: Option<String>,
    end_rule: Option<String>,
    color_hash: Option<String>,
}

impl StudyEpoch {
    /// Creates a new study epoch
    ///
    /// # Business Rules
    /// - A color hash, when given, is `#` followed by six hex digits
    pub fn new(input: NewStudyEpoch) -> DomainResult<Self> {
        Self::with_uid(Uuid::new_v4(), input)
    }

    pub fn with_uid(uid: Uuid, input: NewStudyEpoch) -> DomainResult<Self> {
        if let Some(color) = &input.color_hash {
            validate_color(color)?;
        }

        Ok(Self {
            uid,
            subtype: input.subtype,
            description: input.description,
            start_rule: input.start_rule,
            end_rule: input.end_rule,
            color_hash: input.color_hash,
        })
    }

    /// Applies a partial edit, returning the edited epoch
    pub fn edit(&self, edit: EpochEdit) -> DomainResult<Self> {
        if let Some(color) = &edit.color_hash {
            validate_color(color)?;
        }

        let mut edited = self.clone();
        if let Some(subtype) = edit.subtype {
            edited.subtype = subtype;
        }
        if edit.description.is_some() {
            edited.description = edit.description;
        }
        if edit.start_rule.is_some() {
            edited.start_rule = edit.start_rule;
        }
        if edit.end_rule.is_some() {
            edited.end_rule = edit.end_rule;
        }
        if edit.color_hash.is_some() {
            edited.color_hash = edit.color_hash;
        }
        Ok(edited)
    }

    pub fn uid(&self) -> Uuid {
        self.uid
    }

    pub fn subtype(&self) -> EpochSubtype {
        self.subtype
    }

    pub fn epoch_type(&self) -> EpochType {
        self.subtype.epoch_type()
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

    pub fn color_hash(&self) -> Option<&str> {
        self.color_hash.as_deref()
    }
}

fn validate_color(color: &str) -> DomainResult<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "Invalid epoch color: {}",
            color
        )))
    }
}
