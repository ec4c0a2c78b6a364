//! Back up and restore Docker volumes and images as tar archives.
//!
//! The orchestration core lives in [`core`]; [`utils`] carries configuration,
//! logging and console rendering for the `docker-backup` binary.

pub mod core;
pub mod utils;
