//! # DukeCounter
//!
//! Orchestrates a two-stage photon-counting detector simulation.
//!
//! A run reads a flat `key: value` parameter file and then executes:
//!
//! - **Module 1**: renders Geant4 run macros and C++ sources from templates,
//!   then builds and runs the particle-transport simulation
//! - **Module 2**: serializes the parameters to a MAT-file, renders MATLAB
//!   driver scripts and runs them to model charge sharing and the detector
//!   response
//!
//! Either stage can be switched off with `run_module_1` / `run_module_2`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dukecounter::prelude::*;
//!
//! let report = run_with_console(Path::new("params.txt"), &executable_dir()).await?;
//! println!("{}", report.summary_line());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifacts;
pub mod config;
pub mod core;
pub mod errors;
pub mod matfile;
pub mod observability;
pub mod params;
pub mod pipeline;
pub mod process;
pub mod stages;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ChargeSharing, DetectorDesign, SimulationConfig, Toggle};
    pub use crate::core::{RunReport, StageResult, StageStatus};
    pub use crate::errors::{ConfigError, DukeCounterError, StageError, StageFailure};
    pub use crate::observability::{init_tracing, LogFormat, SpanTimer, Verbosity};
    pub use crate::params::{ParamValue, ParameterSet};
    pub use crate::pipeline::{run_from_file, run_with_console, Pipeline};
    pub use crate::process::{ConsoleSink, NullSink, OutputSink, OutputStream};
    pub use crate::stages::{Stage, StageContext, StageOutcome};
    pub use crate::utils::{executable_dir, format_elapsed};
}
