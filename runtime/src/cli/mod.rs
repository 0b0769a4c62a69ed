//! CLI subcommand implementations for the course-harvest binary.

pub mod doctor;
pub mod run;
