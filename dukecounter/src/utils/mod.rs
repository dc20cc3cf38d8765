//! Small helpers shared across the crate.

pub mod timestamps;

pub use timestamps::{executable_dir, format_elapsed, iso_timestamp};
