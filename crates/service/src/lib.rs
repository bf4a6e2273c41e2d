//! CLI configuration layering and the progression loop that ties the
//! executor, integrity auditor, and metrics together into one continuously
//! running validator.

pub mod backfill;
pub mod config;
pub mod progression;

pub use backfill::BackfillClient;
pub use config::{Cli, Config};
pub use progression::ProgressionLoop;
