// Repository interfaces (ports)
// Implemented by adapters in the infrastructure layer

pub mod study_repository;

pub use study_repository::StudyRepository;
