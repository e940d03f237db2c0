//! Clinical MDR API Library
//!
//! Study design service: epochs and visits of a clinical study, the timeline
//! derived from them, and the HTTP API exposing both.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
