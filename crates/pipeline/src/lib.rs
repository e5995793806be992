//! `vidstats-pipeline` -- drives a statistics run against a project store.
//!
//! [`runner::run`] walks a [`source::ProjectSource`] dataset by dataset and
//! feeds the annotations to the counting engine in `vidstats-core`.

pub mod error;
pub mod local;
pub mod progress;
pub mod runner;
pub mod source;
