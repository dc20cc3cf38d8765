//! Geant4 C++ sources: physics list and detector construction.

use super::{TemplateUnit, SOURCE_BANNER};
use crate::config::{DetectorDesign, SimulationConfig};
use std::fmt::Display;
use std::fmt::Write as _;

const INCLUDES: &str = "#include \"G4String.hh\"\n\
                        #include \"G4SystemOfUnits.hh\"\n\
                        #include \"globals.hh\"\n";

fn string_const(out: &mut String, name: &str, value: &str) {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    let _ = writeln!(out, "static const G4String {name} = \"{escaped}\";");
}

fn length_const(out: &mut String, name: &str, value: impl Display) {
    let _ = writeln!(out, "static const G4double {name} = {value} * mm;");
}

fn header() -> String {
    format!("{SOURCE_BANNER}\n{INCLUDES}\n")
}

/// `src/PhysicsList.cc` selecting the named electromagnetic model.
#[must_use]
pub fn physics_list(config: &SimulationConfig) -> TemplateUnit {
    let mut header = header();
    string_const(&mut header, "kPhysicsListName", &config.physics_list);

    TemplateUnit::new(
        config.source_tree().join("src").join("PhysicsList.cc"),
        header,
        config.template_dir().join("PhysicsList.cc"),
    )
}

/// `src/PCD_DetectorConstruction.cc` for the configured design.
#[must_use]
pub fn detector_construction(config: &SimulationConfig) -> TemplateUnit {
    let mut header = header();
    string_const(&mut header, "kDetectorMaterial", &config.detector_material);
    length_const(&mut header, "kDetectorThicknessZ", &config.detector_thickness_z);
    if config.detector_design == DetectorDesign::EdgeOn {
        length_const(&mut header, "kPixelSizeY", &config.detector_pixel_size_y);
        string_const(&mut header, "kFoilMaterial", &config.foil_material);
        length_const(&mut header, "kFoilThicknessY", &config.foil_thickness_y);
    }

    let body = format!(
        "PCD_DetectorConstruction_{}.cc",
        config.detector_design.template_suffix()
    );
    TemplateUnit::new(
        config.source_tree().join("src").join("PCD_DetectorConstruction.cc"),
        header,
        config.template_dir().join(body),
    )
}
