// Domain layer module exports
// Study design model: epochs, visits and the derived timeline
// Domain is independent of infrastructure concerns

pub mod errors;
pub mod repositories;
pub mod study;
pub mod study_epoch;
pub mod study_visit;
pub mod timeline;
