//! Sequential execution of the simulation stages.
//!
//! Stages run strictly in order. The first failure aborts the run; files
//! written so far stay on disk.

#[cfg(test)]
mod integration_tests;

use crate::config::SimulationConfig;
use crate::core::{RunReport, StageResult};
use crate::errors::Result;
use crate::observability::SpanTimer;
use crate::params::ParameterSet;
use crate::process::{ConsoleSink, OutputSink};
use crate::stages::{DetectorResponseStage, Stage, StageContext, StageOutcome, TransportStage};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

/// An ordered list of stages.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard two-stage simulation: transport, then detector response.
    #[must_use]
    pub fn simulation() -> Self {
        Self::new()
            .stage(Arc::new(TransportStage))
            .stage(Arc::new(DetectorResponseStage))
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    ///
    /// Returns the first stage error; later stages do not run.
    pub async fn run(&self, ctx: &mut StageContext) -> Result<RunReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let span = info_span!("run", run_id = %run_id);

        async {
            let timer = SpanTimer::start("run");
            let mut results = Vec::with_capacity(self.stages.len());

            for stage in &self.stages {
                let stage_timer = SpanTimer::start(stage.name());
                match stage.execute(&mut *ctx).await {
                    Ok(StageOutcome::Completed) => {
                        let result = StageResult::ok(stage.name(), stage_timer.finish());
                        info!(
                            stage = stage.name(),
                            duration_ms = result.duration_ms(),
                            "Stage completed"
                        );
                        results.push(result);
                    }
                    Ok(StageOutcome::Skipped(reason)) => {
                        info!(stage = stage.name(), reason = %reason, "Stage skipped");
                        results.push(StageResult::skipped(stage.name(), reason));
                    }
                    Err(e) => {
                        error!(
                            stage = stage.name(),
                            duration_ms = stage_timer.elapsed().as_secs_f64() * 1000.0,
                            error = %e,
                            "Stage failed"
                        );
                        return Err(e);
                    }
                }
            }

            Ok(RunReport {
                run_id: run_id.clone(),
                started_at,
                stages: results,
                total: timer.finish(),
            })
        }
        .instrument(span)
        .await
    }
}

/// Loads a parameter file and runs the standard simulation.
///
/// `default_source_dir` stands in for `source_dir` when the file has none.
/// Configuration is fully validated before any file is written or any
/// subprocess launched.
///
/// # Errors
///
/// Returns the first loading, configuration or stage error.
pub async fn run_from_file(
    parameter_file: &Path,
    default_source_dir: &Path,
    sink: Box<dyn OutputSink>,
) -> Result<RunReport> {
    let timer = SpanTimer::start("total");
    let parameters = ParameterSet::load(parameter_file)?;
    let config = SimulationConfig::resolve(&parameters, default_source_dir)?;
    config.validate()?;

    let mut ctx = StageContext::with_sink(config, parameters, sink);
    tracing::debug!(
        parameters = %serde_json::to_string(&ctx.resolved_parameters()).unwrap_or_default(),
        "Resolved configuration"
    );
    let mut report = Pipeline::simulation().run(&mut ctx).await?;
    report.total = timer.finish();
    Ok(report)
}

/// [`run_from_file`] with tool output echoed to the console.
///
/// # Errors
///
/// See [`run_from_file`].
pub async fn run_with_console(
    parameter_file: &Path,
    default_source_dir: &Path,
) -> Result<RunReport> {
    run_from_file(parameter_file, default_source_dir, Box::new(ConsoleSink)).await
}
