// Timeline derivation
// Turns the user-entered epochs and visits of a study into the ordered,
// numbered schedule shown in the Schedule of Activities

mod engine;
mod epochs;
pub mod model;
mod resolve;
pub mod study_time;

pub use engine::{
    derive_timeline, MAX_ADDITIONAL_SUBVISITS, MAX_VISIT_NUMBER, NON_VISIT_NUMBER,
    SPECIAL_VISIT_LETTERS, UNSCHEDULED_VISIT_NUMBER,
};
pub use model::{DerivedEpoch, DerivedVisit, Timeline};
