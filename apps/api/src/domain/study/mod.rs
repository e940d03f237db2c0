// Study domain module
// Contains the study aggregate root and its domain events

#![allow(clippy::module_inception)]

pub mod events;
pub mod study;

pub use events::StudyEvent;
pub use study::Study;
