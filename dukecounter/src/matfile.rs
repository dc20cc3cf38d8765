//! MATLAB Level 5 MAT-file writer for the parameter set.
//!
//! Stage 2 loads its configuration from this file instead of re-parsing the
//! text parameter file. Only the three value shapes a [`ParameterSet`] can
//! hold are supported: 1x1 `int64`, 1x1 `double` and 1xN `char`.
//! Everything is written little-endian.

use crate::errors::{DukeCounterError, Result};
use crate::params::{ParamValue, ParameterSet};
use std::io;
use std::path::Path;
use tracing::{info, warn};

const HEADER_TEXT_LEN: usize = 116;
const VERSION: u16 = 0x0100;

// Data types.
const MI_INT8: u32 = 1;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_MATRIX: u32 = 14;

// Array classes.
const MX_CHAR_CLASS: u8 = 4;
const MX_DOUBLE_CLASS: u8 = 6;
const MX_INT64_CLASS: u8 = 14;

/// Longest variable name MATLAB accepts.
pub const MAX_NAME_LEN: usize = 63;

/// What a write produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatWriteSummary {
    /// Number of variables written.
    pub written: usize,
    /// Keys that are not valid MATLAB variable names.
    pub skipped: Vec<String>,
}

/// Returns true if `name` can be a MATLAB variable name.
#[must_use]
pub fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_NAME_LEN
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn len_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "MAT element too large"))
}

fn dim_i32(len: usize) -> io::Result<i32> {
    i32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "MAT dimension too large"))
}

/// Appends a tagged data element, padded to an 8-byte boundary.
fn push_element(buf: &mut Vec<u8>, data_type: u32, data: &[u8]) -> io::Result<()> {
    buf.extend_from_slice(&data_type.to_le_bytes());
    buf.extend_from_slice(&len_u32(data.len())?.to_le_bytes());
    buf.extend_from_slice(data);
    let padding = (8 - data.len() % 8) % 8;
    buf.resize(buf.len() + padding, 0);
    Ok(())
}

/// Encodes the 128-byte file header.
#[must_use]
pub fn encode_header(description: &str) -> Vec<u8> {
    let mut text: Vec<u8> = description.bytes().take(HEADER_TEXT_LEN).collect();
    text.resize(HEADER_TEXT_LEN, b' ');

    let mut header = text;
    // Subsystem data offset: unused.
    header.extend_from_slice(&[0u8; 8]);
    header.extend_from_slice(&VERSION.to_le_bytes());
    header.extend_from_slice(b"IM");
    header
}

/// Encodes one variable as an `miMATRIX` element.
///
/// # Errors
///
/// Returns `InvalidData` if a string is too long for the format.
pub fn encode_variable(name: &str, value: &ParamValue) -> io::Result<Vec<u8>> {
    let (class, dims, data_type, data) = match value {
        ParamValue::Int(v) => (MX_INT64_CLASS, [1, 1], MI_INT64, v.to_le_bytes().to_vec()),
        ParamValue::Float(v) => (MX_DOUBLE_CLASS, [1, 1], MI_DOUBLE, v.to_le_bytes().to_vec()),
        ParamValue::Str(s) => {
            let units: Vec<u16> = s.encode_utf16().collect();
            let dims = if units.is_empty() {
                [0, 0]
            } else {
                [1, dim_i32(units.len())?]
            };
            let data: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
            (MX_CHAR_CLASS, dims, MI_UINT16, data)
        }
    };

    let mut body = Vec::with_capacity(64 + data.len());

    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&u32::from(class).to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());
    push_element(&mut body, MI_UINT32, &flags)?;

    let dims: Vec<u8> = dims.iter().flat_map(|d: &i32| d.to_le_bytes()).collect();
    push_element(&mut body, MI_INT32, &dims)?;
    push_element(&mut body, MI_INT8, name.as_bytes())?;
    push_element(&mut body, data_type, &data)?;

    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&MI_MATRIX.to_le_bytes());
    out.extend_from_slice(&len_u32(body.len())?.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Encodes a whole parameter set, skipping keys MATLAB cannot load.
///
/// # Errors
///
/// Returns `InvalidData` if a value is too large for the format.
pub fn encode(params: &ParameterSet, description: &str) -> io::Result<(Vec<u8>, MatWriteSummary)> {
    let mut bytes = encode_header(description);
    let mut summary = MatWriteSummary::default();

    for (key, value) in params.iter() {
        if is_valid_variable_name(key) {
            bytes.extend_from_slice(&encode_variable(key, value)?);
            summary.written += 1;
        } else {
            summary.skipped.push(key.to_string());
        }
    }

    Ok((bytes, summary))
}

/// Writes `params` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns an IO error naming the path.
pub fn write_parameters(path: &Path, params: &ParameterSet) -> Result<MatWriteSummary> {
    let description = format!(
        "MATLAB 5.0 MAT-file, Platform: {}, Created on: {} by dukecounter",
        std::env::consts::OS,
        chrono::Utc::now().format("%a %b %e %H:%M:%S %Y"),
    );
    let (bytes, summary) = encode(params, &description).map_err(|e| DukeCounterError::io(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DukeCounterError::io(parent, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| DukeCounterError::io(path, e))?;

    for key in &summary.skipped {
        warn!(key = %key, "Parameter is not a valid MATLAB variable name; not saved");
    }
    info!(path = %path.display(), variables = summary.written, "Parameters saved");
    Ok(summary)
}
