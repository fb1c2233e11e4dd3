//! Utility functions and helpers

pub mod buffer;
pub mod time;
