//! Geant4 run-control macros.
//!
//! Macro headers are `/control/alias` definitions. The static bodies refer to
//! them as `{num_events}`, `{energy_max}` and so on.

use super::{TemplateUnit, MACRO_BANNER};
use crate::config::{DetectorDesign, SimulationConfig};
use std::fmt::Display;
use std::fmt::Write as _;

fn alias(out: &mut String, name: &str, value: impl Display) {
    let _ = writeln!(out, "/control/alias {name} {value}");
}

/// `run_energy.mac`: event count for the energy-deposition run.
#[must_use]
pub fn run_energy_mac(config: &SimulationConfig) -> TemplateUnit {
    let mut header = format!("{MACRO_BANNER}\n");
    alias(&mut header, "num_events", &config.num_events);

    TemplateUnit::new(
        config.source_tree().join("run_energy.mac"),
        header,
        config.template_dir().join("run_energy.mac"),
    )
}

/// `run.mac`: beam and source settings for the configured design.
///
/// Both designs use a rectangular source bounded by the pixel pitch. Edge-on
/// designs also carry the foil material and thickness.
#[must_use]
pub fn run_mac(config: &SimulationConfig) -> TemplateUnit {
    let mut header = format!("{MACRO_BANNER}\n");
    alias(&mut header, "detector_design", config.detector_design);
    alias(&mut header, "num_events", &config.num_events);
    alias(&mut header, "energy_max", &config.energy_max);
    alias(&mut header, "pixel_size_x", &config.detector_pixel_size_x);
    alias(&mut header, "pixel_size_y", &config.detector_pixel_size_y);
    if config.detector_design == DetectorDesign::EdgeOn {
        alias(&mut header, "foil_material", &config.foil_material);
        alias(&mut header, "foil_thickness_y", &config.foil_thickness_y);
    }

    let body = format!("run_{}.mac", config.detector_design.template_suffix());
    TemplateUnit::new(
        config.source_tree().join("run.mac"),
        header,
        config.template_dir().join(body),
    )
}
