//! Core domain model types.
//!
//! - Stage status enum
//! - Per-stage results and the run report

mod result;
mod status;

pub use result::{RunReport, StageResult};
pub use status::StageStatus;
