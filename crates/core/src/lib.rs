//! `vidstats-core` -- frequency statistics over video annotations.
//!
//! Pure domain logic: annotation decoding, per-dataset counters, table
//! assembly and the Report Set. No I/O; project access and the run loop
//! live in `vidstats-pipeline`.

pub mod accumulator;
pub mod annotation;
pub mod assembler;
pub mod counters;
pub mod error;
pub mod meta;
pub mod report;
pub mod scanner;
pub mod table;
pub mod types;
pub mod video_index;
