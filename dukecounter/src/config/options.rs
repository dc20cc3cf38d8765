//! Enumerated options and their strict validation.
//!
//! Coercion in [`crate::params`] never fails; these parsers are where an
//! unsupported value becomes a [`ConfigError`].

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A yes/no switch such as `run_module_1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    /// Enabled.
    Yes,
    /// Disabled.
    No,
}

impl Toggle {
    /// Parses a case-insensitive `yes`/`no`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming `key` for any other value.
    pub fn from_param(key: &str, value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            _ => Err(ConfigError::invalid_option(key, value, "yes/no")),
        }
    }

    /// Returns true when enabled.
    #[must_use]
    pub const fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

/// Detector orientation relative to the incident beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorDesign {
    /// Beam hits the large pixelated face.
    FaceOn,
    /// Beam enters through the thin edge; layers are separated by foils.
    EdgeOn,
}

impl DetectorDesign {
    /// Parses a case-insensitive `face-on`/`edge-on`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for any other value.
    pub fn from_param(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "face-on" => Ok(Self::FaceOn),
            "edge-on" => Ok(Self::EdgeOn),
            _ => Err(ConfigError::invalid_option(
                "detector_design",
                value,
                "face-on/edge-on",
            )),
        }
    }

    /// Suffix used by per-design template names.
    #[must_use]
    pub const fn template_suffix(self) -> &'static str {
        match self {
            Self::FaceOn => "faceon",
            Self::EdgeOn => "edgeon",
        }
    }

    /// Returns true for edge-on designs.
    #[must_use]
    pub const fn is_edge_on(self) -> bool {
        matches!(self, Self::EdgeOn)
    }
}

impl fmt::Display for DetectorDesign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FaceOn => write!(f, "face-on"),
            Self::EdgeOn => write!(f, "edge-on"),
        }
    }
}

/// Whether Stage 2 models charge sharing between neighbouring pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeSharing {
    /// Charge sharing is modelled.
    Enabled,
    /// Ideal per-pixel collection.
    Disabled,
}

impl ChargeSharing {
    /// Parses the `apply_charge_sharing` option.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] unless the value is `yes` or `no`.
    pub fn from_param(value: &str) -> Result<Self, ConfigError> {
        Toggle::from_param("apply_charge_sharing", value).map(|t| match t {
            Toggle::Yes => Self::Enabled,
            Toggle::No => Self::Disabled,
        })
    }

    /// File name of the post-processing routine for this mode.
    #[must_use]
    pub const fn routine_file(self) -> &'static str {
        match self {
            Self::Enabled => "generate_detector_response.m",
            Self::Disabled => "generate_detector_response_no_charge_sharing.m",
        }
    }
}
