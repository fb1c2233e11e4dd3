//! Report output
//!
//! - `text`: the `LogReporter` sink and the end-of-run console summary
//! - `json`: machine-readable run summary

pub mod json;
pub mod text;
