//! `vidstats-cli` library crate.
//!
//! Configuration and output rendering for the `vidstats` binary, exposed
//! for integration testing. The entrypoint lives in `main.rs`.

pub mod config;
pub mod output;
