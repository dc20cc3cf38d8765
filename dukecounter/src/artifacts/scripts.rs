//! MATLAB driver scripts for Stage 2.

use super::{TemplateUnit, SCRIPT_BANNER};
use crate::config::{ChargeSharing, SimulationConfig};
use std::path::Path;

/// Quotes a path as a MATLAB single-quoted string literal.
#[must_use]
pub fn matlab_string(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

/// `generate_detector_response.m`: points the selected routine at the
/// parameter and constants files.
#[must_use]
pub fn detector_response_driver(
    config: &SimulationConfig,
    parameter_file: &Path,
    mode: ChargeSharing,
) -> TemplateUnit {
    let header = format!(
        "{SCRIPT_BANNER}\n\
         parameterFile = {};  % path to parameters .mat file\n\
         constantsFile = {}; % path to constants .mat file\n",
        matlab_string(parameter_file),
        matlab_string(&config.constants_file()),
    );

    TemplateUnit::new(
        config.output_dir.join("generate_detector_response.m"),
        header,
        config.charge_sharing_dir().join(mode.routine_file()),
    )
}

/// `sum_interaction_edgeon.m`: sums interactions across edge-on layers.
#[must_use]
pub fn sum_interaction_driver(config: &SimulationConfig, parameter_file: &Path) -> TemplateUnit {
    let header = format!(
        "{SCRIPT_BANNER}\n\
         parameterFile = {};  % path to parameters .mat file\n",
        matlab_string(parameter_file),
    );

    TemplateUnit::new(
        config.output_dir.join("sum_interaction_edgeon.m"),
        header,
        config.charge_sharing_dir().join("sum_interaction_edgeon.m"),
    )
}
