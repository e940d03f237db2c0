// Study visit domain module
// Contains the study visit entity and the value objects describing its timing

#![allow(clippy::module_inception)]

pub mod value_objects;
pub mod visit;

pub use value_objects::{
    TimeReference, TimeUnit, VisitClass, VisitContactMode, VisitSubclass, VisitTiming, VisitWindow,
};
pub use visit::{NewStudyVisit, StudyVisit};
