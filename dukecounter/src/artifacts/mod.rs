//! Generated input files for the external engines.
//!
//! Every generated file is a [`TemplateUnit`]: a header rendered from the
//! configuration followed by a static body read from disk. The header sets
//! values; the body is the fixed program that reads them.

pub mod macros;
pub mod scripts;
pub mod sources;

use crate::config::SimulationConfig;
use crate::errors::{DukeCounterError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Banner written at the top of generated Geant4 macros.
pub(crate) const MACRO_BANNER: &str =
    "# Generated by dukecounter. Edits are overwritten on the next run.";

/// Banner written at the top of generated C++ sources.
pub(crate) const SOURCE_BANNER: &str =
    "// Generated by dukecounter. Edits are overwritten on the next run.";

/// Banner written at the top of generated MATLAB scripts.
pub(crate) const SCRIPT_BANNER: &str = "%% Generated by dukecounter";

/// A file assembled from a rendered header and a static body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateUnit {
    /// Where the assembled file is written.
    pub destination: PathBuf,
    /// Rendered header text.
    pub header: String,
    /// File whose contents follow the header.
    pub body_source: PathBuf,
}

impl TemplateUnit {
    /// Creates a new unit.
    #[must_use]
    pub fn new(
        destination: impl Into<PathBuf>,
        header: impl Into<String>,
        body_source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            destination: destination.into(),
            header: header.into(),
            body_source: body_source.into(),
        }
    }

    /// Returns the assembled file contents.
    ///
    /// # Errors
    ///
    /// Returns [`DukeCounterError::Template`] if the body cannot be read.
    pub fn render(&self) -> Result<String> {
        let body = std::fs::read_to_string(&self.body_source)
            .map_err(|e| DukeCounterError::template(&self.body_source, e))?;

        let mut out = String::with_capacity(self.header.len() + body.len() + 1);
        out.push_str(&self.header);
        if !self.header.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&body);
        Ok(out)
    }

    /// Renders and writes the unit, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read or the destination
    /// cannot be written.
    pub fn write(&self) -> Result<&Path> {
        let contents = self.render()?;
        if let Some(parent) = self.destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DukeCounterError::io(parent, e))?;
        }
        std::fs::write(&self.destination, contents)
            .map_err(|e| DukeCounterError::io(&self.destination, e))?;
        debug!(
            destination = %self.destination.display(),
            body = %self.body_source.display(),
            "Wrote generated file"
        );
        Ok(&self.destination)
    }
}

/// All Stage 1 inputs for the configured design.
#[must_use]
pub fn transport_units(config: &SimulationConfig) -> Vec<TemplateUnit> {
    vec![
        macros::run_energy_mac(config),
        sources::physics_list(config),
        macros::run_mac(config),
        sources::detector_construction(config),
    ]
}
