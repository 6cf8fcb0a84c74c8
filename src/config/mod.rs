//! Configuration module
//!
//! CLI argument definitions and the system-dependent defaults applied
//! after parsing.

mod settings;

pub use settings::*;
