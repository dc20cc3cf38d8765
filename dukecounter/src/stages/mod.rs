//! Stage trait and the two simulation stages.
//!
//! Stages are the fundamental units of work in a run. Each one checks its own
//! gate in the configuration and either does its work or reports a skip.

mod response;
mod transport;

pub use response::{DetectorResponseStage, MODULE_2, SUM_INTERACTIONS};
pub use transport::{TransportStage, MODULE_1};

use crate::config::SimulationConfig;
use crate::errors::Result;
use crate::params::ParameterSet;
use crate::process::{ConsoleSink, OutputSink};
use async_trait::async_trait;
use std::fmt::Debug;

/// Everything a stage can read, plus where subprocess output goes.
pub struct StageContext {
    /// Resolved configuration.
    pub config: SimulationConfig,
    /// Parameters exactly as parsed from the file.
    pub parameters: ParameterSet,
    /// Receives external tool output.
    pub sink: Box<dyn OutputSink>,
}

impl StageContext {
    /// Creates a context that echoes tool output to the console.
    #[must_use]
    pub fn new(config: SimulationConfig, parameters: ParameterSet) -> Self {
        Self::with_sink(config, parameters, Box::new(ConsoleSink))
    }

    /// Creates a context with a custom output sink.
    #[must_use]
    pub fn with_sink(
        config: SimulationConfig,
        parameters: ParameterSet,
        sink: Box<dyn OutputSink>,
    ) -> Self {
        Self {
            config,
            parameters,
            sink,
        }
    }

    /// The parameter set handed to Stage 2: the parsed file with every
    /// resolved default filled in.
    #[must_use]
    pub fn resolved_parameters(&self) -> ParameterSet {
        let mut full = self.parameters.clone();
        full.overlay(&self.config.to_parameters());
        full
    }
}

impl Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("config", &self.config)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// What a stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage ran to completion.
    Completed,
    /// The stage was switched off.
    Skipped(String),
}

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Executes the stage.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the run.
    async fn execute(&self, ctx: &mut StageContext) -> Result<StageOutcome>;
}
