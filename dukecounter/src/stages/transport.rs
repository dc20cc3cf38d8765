//! Stage 1: Geant4 particle-transport simulation.

use super::{Stage, StageContext, StageOutcome};
use crate::artifacts::transport_units;
use crate::errors::{DukeCounterError, Result};
use crate::process::{run_streaming, Invocation};
use async_trait::async_trait;
use tracing::{info, warn};

/// Stage name used in logs and errors.
pub const MODULE_1: &str = "Module 1";

/// Renders the Geant4 inputs and runs the simulator launcher.
///
/// The launcher is called as
/// `<launcher> <installation dir> <source tree> <output dir>` and is expected
/// to build the application and run it. Its output is streamed without an
/// idle limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportStage;

#[async_trait]
impl Stage for TransportStage {
    fn name(&self) -> &str {
        MODULE_1
    }

    async fn execute(&self, ctx: &mut StageContext) -> Result<StageOutcome> {
        let config = &ctx.config;
        if !config.run_module_1.is_yes() {
            warn!(
                output_dir = %config.output_dir.display(),
                "run_module_1 is set to no, so Monte Carlo simulation results are expected \
                 in the output directory"
            );
            return Ok(StageOutcome::Skipped("run_module_1 is set to no".to_string()));
        }

        info!(design = %config.detector_design, "Running {MODULE_1}");

        for unit in transport_units(config) {
            unit.write()?;
        }
        info!("run.mac, run_energy.mac, PhysicsList.cc and PCD_DetectorConstruction.cc created");

        std::fs::create_dir_all(&config.output_dir)
            .map_err(|e| DukeCounterError::io(&config.output_dir, e))?;

        let invocation = Invocation::new(&config.geant4_launcher)
            .arg(&config.geant4_installation_dir)
            .arg(config.source_tree())
            .arg(&config.output_dir);
        run_streaming(MODULE_1, &invocation, None, ctx.sink.as_mut()).await?;

        info!("Geant4 simulation done successfully. {MODULE_1} run complete");
        Ok(StageOutcome::Completed)
    }
}
