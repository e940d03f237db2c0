// Study epoch domain module

pub mod epoch;
pub mod value_objects;

pub use epoch::{EpochEdit, NewStudyEpoch, StudyEpoch};
pub use value_objects::{EpochSubtype, EpochType};
