//! Resolved simulation configuration.
//!
//! [`SimulationConfig::resolve`] fills every documented parameter with its
//! default when the parameter file leaves it out, and validates the
//! enumerated options that decide which code paths run.

mod options;

pub use options::{ChargeSharing, DetectorDesign, Toggle};

use crate::errors::ConfigError;
use crate::params::{ParamValue, ParameterSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default idle limit for numerical-environment runs.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Every setting that drives a run, after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Root holding the `source/` tree and its templates.
    pub source_dir: PathBuf,
    /// Geant4 installation used by Stage 1.
    pub geant4_installation_dir: PathBuf,
    /// Script that builds and runs the Geant4 application.
    pub geant4_launcher: PathBuf,

    /// Stage 1 gate.
    pub run_module_1: Toggle,
    /// Number of primary photons.
    pub num_events: ParamValue,
    /// Upper bound of the beam spectrum (keV).
    pub energy_max: ParamValue,
    /// Physics model name (lower-cased).
    pub physics_list: String,
    /// Sensor material (lower-cased).
    pub detector_material: String,
    /// Sensor thickness along the beam (mm).
    pub detector_thickness_z: ParamValue,
    /// Face-on or edge-on.
    pub detector_design: DetectorDesign,
    /// Inter-layer foil material for edge-on designs (lower-cased).
    pub foil_material: String,
    /// Foil thickness (mm).
    pub foil_thickness_y: ParamValue,

    /// Where both stages write their results.
    pub output_dir: PathBuf,

    /// Stage 2 gate.
    pub run_module_2: Toggle,
    /// Passed through to the numerical environment.
    pub num_workers_parallel_computing: ParamValue,
    /// Pixel pitch x (mm).
    pub detector_pixel_size_x: ParamValue,
    /// Pixel pitch y (mm).
    pub detector_pixel_size_y: ParamValue,
    /// Raw `apply_charge_sharing`; validated by Stage 2 via [`ChargeSharing`].
    pub apply_charge_sharing: String,
    /// Bias voltage (V).
    pub bias_voltage: ParamValue,
    /// Electronic noise sigma (keV).
    pub sigma_electronic_noise: ParamValue,
    /// Side length of the detector response matrix.
    pub detector_response_matrix_size_xy: ParamValue,
    /// Whether Stage 2 also exports the DukeSim response.
    pub generate_dukesim_detector_response: String,
    /// Low energy threshold `LT` (keV).
    pub low_threshold: ParamValue,
    /// High energy threshold `HT` (keV).
    pub high_threshold: ParamValue,

    /// Numerical environment executable.
    pub matlab_executable: String,
    /// No-output limit for numerical-environment runs.
    pub matlab_idle_timeout: Duration,
}

impl SimulationConfig {
    /// Applies defaults and validates `detector_design` and the stage gates.
    ///
    /// `default_source_dir` is used when the file has no `source_dir`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unsupported design, stage gate or
    /// idle timeout.
    pub fn resolve(params: &ParameterSet, default_source_dir: &Path) -> Result<Self, ConfigError> {
        let source_dir = params
            .get("source_dir")
            .map_or_else(|| default_source_dir.to_path_buf(), |v| PathBuf::from(v.to_string()));
        let geant4_installation_dir = params
            .get("geant4_installation_dir")
            .map_or_else(|| source_dir.join("geant4"), |v| PathBuf::from(v.to_string()));
        let geant4_launcher = params
            .get("geant4_launcher")
            .map_or_else(
                || source_dir.join("source").join("run_simulation.sh"),
                |v| PathBuf::from(v.to_string()),
            );

        let lower = |key: &str, default: &str| params.text_or(key, default).to_lowercase();

        Ok(Self {
            geant4_installation_dir,
            geant4_launcher,
            run_module_1: Toggle::from_param(
                "run_module_1",
                &params.text_or("run_module_1", "yes"),
            )?,
            num_events: params.get_or("num_events", 100_000_i64),
            energy_max: params.get_or("energy_max", 120_i64),
            physics_list: lower("physics_list", "livermore"),
            detector_material: lower("detector_material", "cdte"),
            detector_thickness_z: params.get_or("detector_thickness_z", 1.6),
            detector_design: DetectorDesign::from_param(
                &params.text_or("detector_design", "face-on"),
            )?,
            foil_material: lower("foil_material", "W"),
            foil_thickness_y: params.get_or("foil_thickness_y", 0.02),
            output_dir: PathBuf::from(params.text_or("output_dir", "./output")),
            run_module_2: Toggle::from_param(
                "run_module_2",
                &params.text_or("run_module_2", "yes"),
            )?,
            num_workers_parallel_computing: params.get_or("num_workers_parallel_computing", 32_i64),
            detector_pixel_size_x: params.get_or("detector_pixel_size_x", 0.50),
            detector_pixel_size_y: params.get_or("detector_pixel_size_y", 0.60),
            apply_charge_sharing: params.text_or("apply_charge_sharing", "yes"),
            bias_voltage: params.get_or("bias_voltage", 1000_i64),
            sigma_electronic_noise: params.get_or("sigma_electronic_noise", 1.5),
            detector_response_matrix_size_xy: params
                .get_or("detector_response_matrix_size_xy", 3_i64),
            generate_dukesim_detector_response: params
                .text_or("generate_dukesim_detector_response", "yes"),
            low_threshold: params.get_or("LT", 20_i64),
            high_threshold: params.get_or("HT", 65_i64),
            matlab_executable: params.text_or("matlab_executable", "matlab"),
            matlab_idle_timeout: idle_timeout(params.get("matlab_idle_timeout"))?,
            source_dir,
        })
    }

    /// Checks options that are otherwise only validated when consumed.
    ///
    /// Running this before Stage 1 means a typo in a Stage 2 option fails
    /// fast instead of after a long transport simulation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if Stage 2 is enabled and
    /// `apply_charge_sharing` is not yes/no.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_module_2.is_yes() {
            ChargeSharing::from_param(&self.apply_charge_sharing)?;
        }
        Ok(())
    }

    /// The source tree the transport simulator builds from.
    #[must_use]
    pub fn source_tree(&self) -> PathBuf {
        self.source_dir.join("source")
    }

    /// Directory with the static template bodies.
    #[must_use]
    pub fn template_dir(&self) -> PathBuf {
        self.source_tree().join("templates")
    }

    /// Directory with the Stage 2 routines and material constants.
    #[must_use]
    pub fn charge_sharing_dir(&self) -> PathBuf {
        self.source_tree().join("constants_charge_sharing")
    }

    /// Material constants file read by the Stage 2 routines.
    #[must_use]
    pub fn constants_file(&self) -> PathBuf {
        self.charge_sharing_dir()
            .join(format!("constants_{}.mat", self.detector_material))
    }

    /// Where the serialized parameter set is written.
    #[must_use]
    pub fn parameter_file(&self) -> PathBuf {
        self.output_dir.join("simulation_parameters.mat")
    }

    /// The resolved values under their parameter-file keys.
    #[must_use]
    pub fn to_parameters(&self) -> ParameterSet {
        let path = |p: &Path| ParamValue::Str(p.display().to_string());
        [
            ("geant4_installation_dir", path(&self.geant4_installation_dir)),
            ("run_module_1", self.run_module_1.to_string().into()),
            ("num_events", self.num_events.clone()),
            ("energy_max", self.energy_max.clone()),
            ("physics_list", self.physics_list.clone().into()),
            ("detector_material", self.detector_material.clone().into()),
            ("detector_thickness_z", self.detector_thickness_z.clone()),
            ("detector_design", self.detector_design.to_string().into()),
            ("foil_material", self.foil_material.clone().into()),
            ("foil_thickness_y", self.foil_thickness_y.clone()),
            ("output_dir", path(&self.output_dir)),
            ("run_module_2", self.run_module_2.to_string().into()),
            ("num_workers_parallel_computing", self.num_workers_parallel_computing.clone()),
            ("detector_pixel_size_x", self.detector_pixel_size_x.clone()),
            ("detector_pixel_size_y", self.detector_pixel_size_y.clone()),
            ("apply_charge_sharing", self.apply_charge_sharing.clone().into()),
            ("bias_voltage", self.bias_voltage.clone()),
            ("sigma_electronic_noise", self.sigma_electronic_noise.clone()),
            ("detector_response_matrix_size_xy", self.detector_response_matrix_size_xy.clone()),
            (
                "generate_dukesim_detector_response",
                self.generate_dukesim_detector_response.clone().into(),
            ),
            ("LT", self.low_threshold.clone()),
            ("HT", self.high_threshold.clone()),
        ]
        .into_iter()
        .collect()
    }
}

fn idle_timeout(value: Option<&ParamValue>) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(DEFAULT_IDLE_TIMEOUT);
    };
    value
        .as_f64()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| {
            ConfigError::invalid_option(
                "matlab_idle_timeout",
                value.to_string(),
                "a positive number of seconds",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(text: &str) -> Result<SimulationConfig, ConfigError> {
        let params: ParameterSet = text.parse().unwrap();
        SimulationConfig::resolve(&params, Path::new("/opt/dukecounter"))
    }

    #[test]
    fn test_defaults() {
        let config = resolve("").unwrap();
        assert_eq!(config.source_dir, PathBuf::from("/opt/dukecounter"));
        assert_eq!(config.geant4_installation_dir, PathBuf::from("/opt/dukecounter/geant4"));
        assert_eq!(
            config.geant4_launcher,
            PathBuf::from("/opt/dukecounter/source/run_simulation.sh")
        );
        assert_eq!(config.run_module_1, Toggle::Yes);
        assert_eq!(config.num_events, ParamValue::Int(100_000));
        assert_eq!(config.energy_max, ParamValue::Int(120));
        assert_eq!(config.physics_list, "livermore");
        assert_eq!(config.detector_material, "cdte");
        assert_eq!(config.detector_design, DetectorDesign::FaceOn);
        assert_eq!(config.foil_material, "w");
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.detector_pixel_size_x, ParamValue::Float(0.5));
        assert_eq!(config.low_threshold, ParamValue::Int(20));
        assert_eq!(config.high_threshold, ParamValue::Int(65));
        assert_eq!(config.matlab_executable, "matlab");
        assert_eq!(config.matlab_idle_timeout, DEFAULT_IDLE_TIMEOUT);
    }

    #[test]
    fn test_overrides_and_lowercasing() {
        let config = resolve(
            "detector_design: Edge-On\nphysics_list: PENELOPE\nnum_events: 500 # few\n\
             geant4_installation_dir: /usr/local/geant4\nfoil_material: Mo\n",
        )
        .unwrap();
        assert_eq!(config.detector_design, DetectorDesign::EdgeOn);
        assert_eq!(config.physics_list, "penelope");
        assert_eq!(config.num_events, ParamValue::Int(500));
        assert_eq!(config.foil_material, "mo");
        assert_eq!(config.geant4_installation_dir, PathBuf::from("/usr/local/geant4"));
    }

    #[test]
    fn test_invalid_design_is_fatal() {
        let err = resolve("detector_design: sideways").unwrap_err();
        assert_eq!(err.key, "detector_design");
        assert_eq!(err.value, "sideways");
    }

    #[test]
    fn test_invalid_stage_gate_is_fatal() {
        let err = resolve("run_module_1: perhaps").unwrap_err();
        assert_eq!(err.key, "run_module_1");
    }

    #[test]
    fn test_validate_checks_charge_sharing_only_when_stage2_enabled() {
        let config = resolve("apply_charge_sharing: partly").unwrap();
        assert_eq!(config.validate().unwrap_err().key, "apply_charge_sharing");

        let config = resolve("apply_charge_sharing: partly\nrun_module_2: no").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_idle_timeout_override() {
        let config = resolve("matlab_idle_timeout: 2.5").unwrap();
        assert_eq!(config.matlab_idle_timeout, Duration::from_millis(2500));
        assert!(resolve("matlab_idle_timeout: soon").is_err());
        assert!(resolve("matlab_idle_timeout: 0").is_err());
        assert!(resolve("matlab_idle_timeout: -3").is_err());
    }

    #[test]
    fn test_idle_timeout_out_of_range_is_rejected() {
        let err = resolve("matlab_idle_timeout: 1.0e30").unwrap_err();
        assert_eq!(err.key, "matlab_idle_timeout");
        assert_eq!(err.value, "1e30");
    }

    #[test]
    fn test_paths() {
        let config = resolve("output_dir: /tmp/run\ndetector_material: Si").unwrap();
        assert_eq!(config.parameter_file(), PathBuf::from("/tmp/run/simulation_parameters.mat"));
        assert_eq!(
            config.constants_file(),
            PathBuf::from("/opt/dukecounter/source/constants_charge_sharing/constants_si.mat")
        );
        assert_eq!(config.template_dir(), PathBuf::from("/opt/dukecounter/source/templates"));
    }

    #[test]
    fn test_to_parameters_has_resolved_keys() {
        let config = resolve("detector_design: EDGE-ON").unwrap();
        let params = config.to_parameters();
        assert_eq!(params.len(), 22);
        assert_eq!(params.get("detector_design"), Some(&ParamValue::from("edge-on")));
        assert_eq!(params.get("num_events"), Some(&ParamValue::Int(100_000)));
        assert_eq!(params.get("HT"), Some(&ParamValue::Int(65)));
    }
}
