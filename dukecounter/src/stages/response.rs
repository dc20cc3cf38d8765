//! Stage 2: charge-sharing and detector-response modelling in MATLAB.

use super::{Stage, StageContext, StageOutcome};
use crate::artifacts::scripts::{detector_response_driver, matlab_string, sum_interaction_driver};
use crate::config::{ChargeSharing, SimulationConfig};
use crate::errors::Result;
use crate::matfile;
use crate::process::{run_streaming, Invocation, OutputSink};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Stage name used in logs and errors.
pub const MODULE_2: &str = "Module 2";

/// Stage name for the edge-on interaction summation run.
pub const SUM_INTERACTIONS: &str = "Module 2 (interaction summation)";

/// Serializes the parameters, then runs the generated MATLAB drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectorResponseStage;

fn matlab(config: &SimulationConfig, script: &Path) -> Invocation {
    Invocation::new(&config.matlab_executable)
        .arg("-batch")
        .arg(format!("run({})", matlab_string(script)))
}

async fn run_script(
    stage: &str,
    config: &SimulationConfig,
    script: &Path,
    sink: &mut dyn OutputSink,
) -> Result<()> {
    run_streaming(stage, &matlab(config, script), Some(config.matlab_idle_timeout), sink).await?;
    Ok(())
}

#[async_trait]
impl Stage for DetectorResponseStage {
    fn name(&self) -> &str {
        MODULE_2
    }

    async fn execute(&self, ctx: &mut StageContext) -> Result<StageOutcome> {
        if !ctx.config.run_module_2.is_yes() {
            return Ok(StageOutcome::Skipped("run_module_2 is set to no".to_string()));
        }
        info!("Running {MODULE_2}");

        let mode = ChargeSharing::from_param(&ctx.config.apply_charge_sharing)?;

        let parameter_file = ctx.config.parameter_file();
        matfile::write_parameters(&parameter_file, &ctx.resolved_parameters())?;

        let config = &ctx.config;
        if config.detector_design.is_edge_on() {
            info!("Summing interactions for edge-on PCD");
            let unit = sum_interaction_driver(config, &parameter_file);
            let script = unit.write()?;
            run_script(SUM_INTERACTIONS, config, script, ctx.sink.as_mut()).await?;
        }

        match mode {
            ChargeSharing::Enabled => info!("Applying charge sharing effect"),
            ChargeSharing::Disabled => info!("Not applying charge sharing effect"),
        }
        let unit = detector_response_driver(config, &parameter_file, mode);
        let script = unit.write()?;
        run_script(MODULE_2, config, script, ctx.sink.as_mut()).await?;

        info!("{MODULE_2} run complete");
        Ok(StageOutcome::Completed)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::errors::DukeCounterError;
    use crate::params::ParameterSet;
    use crate::process::NullSink;
    use std::os::unix::fs::PermissionsExt;

    const ROUTINES: [&str; 3] = [
        "generate_detector_response.m",
        "generate_detector_response_no_charge_sharing.m",
        "sum_interaction_edgeon.m",
    ];

    fn seed(root: &Path) {
        let dir = root.join("source").join("constants_charge_sharing");
        std::fs::create_dir_all(&dir).unwrap();
        for name in ROUTINES {
            std::fs::write(dir.join(name), format!("disp('{name}');\n")).unwrap();
        }
    }

    /// Stand-in numerical environment that logs its last argument.
    fn fake_matlab(root: &Path, extra: &str) -> std::path::PathBuf {
        let path = root.join("fake_matlab");
        let log = root.join("matlab.log");
        std::fs::write(
            &path,
            format!("#!/bin/sh\necho \"$2\" >> {}\n{extra}\n", log.display()),
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn context(root: &Path, extra: &str) -> StageContext {
        let text = format!(
            "source_dir: {}\noutput_dir: {}\nmatlab_executable: {}\n{extra}",
            root.display(),
            root.join("out").display(),
            root.join("fake_matlab").display(),
        );
        let params: ParameterSet = text.parse().unwrap();
        let config = SimulationConfig::resolve(&params, root).unwrap();
        StageContext::with_sink(config, params, Box::new(NullSink))
    }

    fn invocations(root: &Path) -> Vec<String> {
        std::fs::read_to_string(root.join("matlab.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_skipped_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path(), "run_module_2: no\n");
        let outcome = DetectorResponseStage.execute(&mut ctx).await.unwrap();
        assert!(matches!(outcome, StageOutcome::Skipped(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_face_on_runs_single_driver() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        fake_matlab(dir.path(), "");
        let mut ctx = context(dir.path(), "apply_charge_sharing: YES\n");

        DetectorResponseStage.execute(&mut ctx).await.unwrap();

        let out = dir.path().join("out");
        assert!(out.join("simulation_parameters.mat").exists());
        let driver = std::fs::read_to_string(out.join("generate_detector_response.m")).unwrap();
        assert!(driver.contains("constants_cdte.mat"));
        assert!(driver.ends_with("disp('generate_detector_response.m');\n"));
        assert!(!out.join("sum_interaction_edgeon.m").exists());

        let calls = invocations(dir.path());
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("run('"));
        assert!(calls[0].ends_with("generate_detector_response.m')"));
    }

    #[tokio::test]
    async fn test_edge_on_sums_interactions_first() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        fake_matlab(dir.path(), "");
        let mut ctx = context(dir.path(), "detector_design: edge-on\napply_charge_sharing: no\n");

        DetectorResponseStage.execute(&mut ctx).await.unwrap();

        let calls = invocations(dir.path());
        assert_eq!(calls.len(), 2);
        assert!(calls[0].ends_with("sum_interaction_edgeon.m')"));
        assert!(calls[1].ends_with("generate_detector_response.m')"));
        let driver = std::fs::read_to_string(
            dir.path().join("out").join("generate_detector_response.m"),
        )
        .unwrap();
        assert!(driver.contains("generate_detector_response_no_charge_sharing.m"));
    }

    #[tokio::test]
    async fn test_invalid_charge_sharing_stops_before_matlab() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        fake_matlab(dir.path(), "");
        let mut ctx = context(dir.path(), "apply_charge_sharing: sometimes\n");

        let err = DetectorResponseStage.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(err, DukeCounterError::Config(ref c) if c.key == "apply_charge_sharing"));
        assert!(invocations(dir.path()).is_empty());
        assert!(!dir.path().join("out").join("generate_detector_response.m").exists());
    }

    #[tokio::test]
    async fn test_matlab_failure_names_stage() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        fake_matlab(dir.path(), "exit 1");
        let mut ctx = context(dir.path(), "");

        let err = DetectorResponseStage.execute(&mut ctx).await.unwrap_err();
        assert_eq!(err.as_stage().unwrap().stage, MODULE_2);
        assert!(err.to_string().starts_with("Module 2 run failed"));
    }
}
