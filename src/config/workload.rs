//! Workload definition structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the scheduler picks the next LBA
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessPattern {
    /// Uniform random LBAs, duty-cycled between reads and writes
    Random,
    /// Cursor sweeps through the range
    Linear {
        #[serde(default)]
        sweep: LinearSweep,
        /// Strict write/read alternation, each read retracing the preceding write
        #[serde(default)]
        interleaved: bool,
    },
}

impl Default for AccessPattern {
    fn default() -> Self {
        Self::Random
    }
}

impl AccessPattern {
    pub fn is_linear(&self) -> bool {
        matches!(self, AccessPattern::Linear { .. })
    }

    pub fn is_interleaved(&self) -> bool {
        matches!(self, AccessPattern::Linear { interleaved: true, .. })
    }
}

/// What a linear cursor does when it reaches the end of its sweep
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinearSweep {
    /// Restart at the start LBA and sweep upward again
    Retrace,
    /// Reverse direction and sweep back
    Bounce,
}

impl Default for LinearSweep {
    fn default() -> Self {
        Self::Retrace
    }
}

/// Fill content for written data
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FillPattern {
    /// Byte `i` of the transfer is `i mod 256`
    Counting,
    /// A constant value repeated across the buffer
    Fixed(u64),
    /// One block of pseudo-random bytes, regenerated every pass
    Random,
    /// Each block filled with its own LBA
    Lba,
}

impl Default for FillPattern {
    fn default() -> Self {
        Self::Counting
    }
}

/// Which blocks of a written transfer carry a marker header
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkMode {
    First,
    Last,
    All,
}

/// The LBA range under test, in blocks or in transfer-sized units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum AddressRange {
    /// Inclusive LBA range; `stop` defaults to the last block of the volume
    Lba { start: u64, stop: Option<u64> },
    /// Inclusive range of transfer-sized units (fixed transfer size only)
    Block { start: u64, stop: Option<u64> },
}

impl Default for AddressRange {
    fn default() -> Self {
        Self::Lba { start: 0, stop: None }
    }
}

// Display trait implementations

impl fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPattern::Random => write!(f, "random"),
            AccessPattern::Linear { sweep, interleaved } => {
                write!(f, "linear ({})", sweep)?;
                if *interleaved {
                    write!(f, ", interleaved")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for LinearSweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinearSweep::Retrace => write!(f, "up-up"),
            LinearSweep::Bounce => write!(f, "up-down"),
        }
    }
}

impl fmt::Display for FillPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillPattern::Counting => write!(f, "counting"),
            FillPattern::Fixed(value) => write!(f, "fixed 0x{:x}", value),
            FillPattern::Random => write!(f, "random"),
            FillPattern::Lba => write!(f, "lba"),
        }
    }
}

impl fmt::Display for MarkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkMode::First => write!(f, "first"),
            MarkMode::Last => write!(f, "last"),
            MarkMode::All => write!(f, "all"),
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (unit, start, stop) = match self {
            AddressRange::Lba { start, stop } => ("lba", start, stop),
            AddressRange::Block { start, stop } => ("block", start, stop),
        };
        match stop {
            Some(stop) => write!(f, "{} {}:{}", unit, start, stop),
            None => write!(f, "{} {}:end", unit, start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_pattern_predicates() {
        assert!(!AccessPattern::Random.is_linear());
        let linear = AccessPattern::Linear {
            sweep: LinearSweep::Bounce,
            interleaved: true,
        };
        assert!(linear.is_linear());
        assert!(linear.is_interleaved());
        assert_eq!(linear.to_string(), "linear (up-down), interleaved");
    }

    #[test]
    fn test_fill_pattern_display() {
        assert_eq!(FillPattern::Fixed(0xab).to_string(), "fixed 0xab");
        assert_eq!(FillPattern::default(), FillPattern::Counting);
    }

    #[test]
    fn test_address_range_display() {
        assert_eq!(AddressRange::default().to_string(), "lba 0:end");
        assert_eq!(
            AddressRange::Block { start: 1, stop: Some(4) }.to_string(),
            "block 1:4"
        );
    }
}
