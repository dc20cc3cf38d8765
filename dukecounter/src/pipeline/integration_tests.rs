//! End-to-end runs against stand-in launcher and numerical-environment scripts.

#![cfg(unix)]

use super::run_from_file;
use crate::core::StageStatus;
use crate::errors::DukeCounterError;
use crate::process::NullSink;
use crate::stages::{MODULE_1, MODULE_2};
use regex::Regex;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const TEMPLATES: [&str; 6] = [
    "run_energy.mac",
    "run_faceon.mac",
    "run_edgeon.mac",
    "PhysicsList.cc",
    "PCD_DetectorConstruction_faceon.cc",
    "PCD_DetectorConstruction_edgeon.cc",
];

const ROUTINES: [&str; 3] = [
    "generate_detector_response.m",
    "generate_detector_response_no_charge_sharing.m",
    "sum_interaction_edgeon.m",
];

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let templates = source.join("templates");
        let routines = source.join("constants_charge_sharing");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::create_dir_all(&routines).unwrap();
        for name in TEMPLATES {
            std::fs::write(templates.join(name), format!("// body of {name}\n")).unwrap();
        }
        for name in ROUTINES {
            std::fs::write(routines.join(name), format!("disp('{name}');\n")).unwrap();
        }
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn out(&self) -> PathBuf {
        self.root().join("out")
    }

    fn log(&self, name: &str) -> Vec<String> {
        std::fs::read_to_string(self.root().join(name))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Launcher that records its arguments in `launcher.log`.
    fn launcher(&self) -> PathBuf {
        let log = self.root().join("launcher.log");
        self.script("launch.sh", &format!("echo \"$@\" >> {}", log.display()))
    }

    /// Numerical environment that records its `-batch` command in `matlab.log`.
    fn matlab(&self, extra: &str) -> PathBuf {
        let log = self.root().join("matlab.log");
        self.script(
            "fake_matlab",
            &format!("echo \"$2\" >> {}\n{extra}", log.display()),
        )
    }

    fn parameter_file(&self, body: &str) -> PathBuf {
        let path = self.root().join("parameters.txt");
        let text = format!(
            "# Simulation parameters\noutput_dir: {}\n{body}",
            self.out().display()
        );
        std::fs::write(&path, text).unwrap();
        path
    }
}

#[tokio::test]
async fn test_stage2_only_face_on_run() {
    let fx = Fixture::new();
    let matlab = fx.matlab("echo working");
    let file = fx.parameter_file(&format!(
        "run_module_1: no\nrun_module_2: yes\ndetector_design: face-on\n\
         apply_charge_sharing: no  # faster\nmatlab_executable: {}\n",
        matlab.display()
    ));

    let report = run_from_file(&file, fx.root(), Box::new(NullSink)).await.unwrap();

    assert_eq!(report.stages.len(), 2);
    assert_eq!(report.stage(MODULE_1).unwrap().status, StageStatus::Skip);
    assert_eq!(report.stage(MODULE_2).unwrap().status, StageStatus::Ok);
    assert!(!fx.root().join("source").join("run.mac").exists());
    assert!(!fx.root().join("source").join("src").exists());

    assert!(fx.out().join("simulation_parameters.mat").exists());
    let driver = std::fs::read_to_string(fx.out().join("generate_detector_response.m")).unwrap();
    assert!(driver.contains("simulation_parameters.mat"));
    assert!(driver.ends_with("disp('generate_detector_response_no_charge_sharing.m');\n"));

    let calls = fx.log("matlab.log");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].ends_with("generate_detector_response.m')"));

    let summary =
        Regex::new(r"^Total time for the simulation = \d+ hr, \d+ min, \d+ sec\.$").unwrap();
    assert!(summary.is_match(&report.summary_line()));
}

#[tokio::test]
async fn test_edge_on_full_run() {
    let fx = Fixture::new();
    let launcher = fx.launcher();
    let matlab = fx.matlab("");
    let file = fx.parameter_file(&format!(
        "geant4_launcher: {}\ngeant4_installation_dir: /opt/geant4\n\
         detector_design: Edge-On\nfoil_material: Mo\nnum_events: 2000\n\
         matlab_executable: {}\n",
        launcher.display(),
        matlab.display()
    ));

    let report = run_from_file(&file, fx.root(), Box::new(NullSink)).await.unwrap();
    assert_eq!(report.stages.len(), 2);
    assert!(report.stages.iter().all(|s| s.status == StageStatus::Ok));

    let source = fx.root().join("source");
    let run_mac = std::fs::read_to_string(source.join("run.mac")).unwrap();
    assert!(run_mac.contains("/control/alias foil_material mo"));
    assert!(run_mac.contains("/control/alias num_events 2000"));
    assert!(run_mac.ends_with("// body of run_edgeon.mac\n"));

    let launches = fx.log("launcher.log");
    assert_eq!(launches.len(), 1);
    assert!(launches[0].starts_with("/opt/geant4 "));

    let calls = fx.log("matlab.log");
    assert_eq!(calls.len(), 2);
    assert!(calls[0].ends_with("sum_interaction_edgeon.m')"));
    assert!(calls[1].ends_with("generate_detector_response.m')"));
}

#[tokio::test]
async fn test_invalid_design_fails_before_any_work() {
    let fx = Fixture::new();
    let launcher = fx.launcher();
    let file = fx.parameter_file(&format!(
        "geant4_launcher: {}\ndetector_design: diagonal\n",
        launcher.display()
    ));

    let err = run_from_file(&file, fx.root(), Box::new(NullSink)).await.unwrap_err();

    assert!(matches!(err, DukeCounterError::Config(ref c) if c.key == "detector_design"));
    assert!(err.to_string().contains("face-on/edge-on"));
    assert!(fx.log("launcher.log").is_empty());
    assert!(!fx.root().join("source").join("run.mac").exists());
    assert!(!fx.out().exists());
}

#[tokio::test]
async fn test_charge_sharing_typo_fails_before_transport() {
    let fx = Fixture::new();
    let launcher = fx.launcher();
    let file = fx.parameter_file(&format!(
        "geant4_launcher: {}\napply_charge_sharing: maybe\n",
        launcher.display()
    ));

    let err = run_from_file(&file, fx.root(), Box::new(NullSink)).await.unwrap_err();

    assert!(matches!(err, DukeCounterError::Config(ref c) if c.key == "apply_charge_sharing"));
    assert!(fx.log("launcher.log").is_empty());
}

#[tokio::test]
async fn test_silent_matlab_hits_idle_timeout() {
    let fx = Fixture::new();
    let matlab = fx.matlab("exec sleep 30");
    let file = fx.parameter_file(&format!(
        "run_module_1: no\nmatlab_executable: {}\nmatlab_idle_timeout: 0.3\n",
        matlab.display()
    ));

    let err = run_from_file(&file, fx.root(), Box::new(NullSink)).await.unwrap_err();

    let stage = err.as_stage().unwrap();
    assert_eq!(stage.stage, MODULE_2);
    assert!(stage.is_timeout());
    // Parameters were serialized before the numerical environment started.
    assert!(fx.out().join("simulation_parameters.mat").exists());
}

#[tokio::test]
async fn test_transport_failure_skips_stage2() {
    let fx = Fixture::new();
    let launcher = fx.script("launch.sh", "echo boom >&2\nexit 3");
    let matlab = fx.matlab("");
    let file = fx.parameter_file(&format!(
        "geant4_launcher: {}\nmatlab_executable: {}\n",
        launcher.display(),
        matlab.display()
    ));

    let err = run_from_file(&file, fx.root(), Box::new(NullSink)).await.unwrap_err();

    assert_eq!(err.as_stage().unwrap().stage, MODULE_1);
    assert!(fx.log("matlab.log").is_empty());
    assert!(!fx.out().join("simulation_parameters.mat").exists());
}

#[tokio::test]
async fn test_missing_parameter_file() {
    let fx = Fixture::new();
    let missing = fx.root().join("nope.txt");

    let err = run_from_file(&missing, fx.root(), Box::new(NullSink)).await.unwrap_err();

    match err {
        DukeCounterError::Io { path, source } => {
            assert_eq!(path, missing);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_both_stages_disabled() {
    let fx = Fixture::new();
    let file = fx.parameter_file("run_module_1: no\nrun_module_2: no\n");

    let report = run_from_file(&file, fx.root(), Box::new(NullSink)).await.unwrap();

    assert!(report.stages.iter().all(|s| s.status == StageStatus::Skip));
    assert!(!fx.out().exists());
}
