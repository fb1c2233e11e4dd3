//! Failure taxonomy
//!
//! Per-transfer failures (`IoFailure`) never escape the worker loop as errors:
//! the worker turns them into state mutations and hands them to the reporting
//! sink. `EngineError` covers the conditions that end the whole run.

use crate::engine::OperationType;
use thiserror::Error;

/// A failed transfer, recorded and reported but never retried
#[derive(Debug, Error)]
pub enum IoFailure {
    #[error("seek failed: lba {lba}, requested pos {requested}, seek pos {actual}")]
    SeekMismatch { lba: u64, requested: u64, actual: u64 },

    #[error("seek failed: lba {lba}, requested pos {requested}: {source}")]
    Seek {
        lba: u64,
        requested: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} access failed: lba {lba}, got = {transferred}, asked for = {requested}")]
    ShortTransfer {
        op: OperationType,
        lba: u64,
        requested: usize,
        transferred: usize,
    },

    #[error("{op} failed at lba {lba}: {source}")]
    Transfer {
        op: OperationType,
        lba: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("sync after write failed at lba {lba}: {source}")]
    Sync {
        lba: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("data miscompare at lba {} (0x{:x})", .0.lba, .0.lba)]
    Miscompare(Box<Miscompare>),
}

impl IoFailure {
    /// LBA of the transfer that failed
    pub fn lba(&self) -> u64 {
        match self {
            IoFailure::SeekMismatch { lba, .. }
            | IoFailure::Seek { lba, .. }
            | IoFailure::ShortTransfer { lba, .. }
            | IoFailure::Transfer { lba, .. }
            | IoFailure::Sync { lba, .. } => *lba,
            IoFailure::Miscompare(m) => m.lba,
        }
    }
}

/// Diagnostic record for a read whose content differs from the expected pattern
#[derive(Debug, Clone)]
pub struct Miscompare {
    pub lba: u64,
    pub pass: u64,
    pub worker_id: usize,
    /// Byte offset of the first differing byte within the transfer
    pub offset: usize,
    pub expected: Vec<u8>,
    pub actual: Vec<u8>,
}

impl Miscompare {
    /// LBA of the block holding the first differing byte
    pub fn failing_lba(&self) -> u64 {
        self.lba + (self.offset as u64 / crate::BLOCK_SIZE)
    }

    /// Hex dump of the expected and actual buffers
    pub fn dump(&self) -> String {
        let mut out = String::new();
        out.push_str("EXPECTED:\n");
        out.push_str(&crate::pattern::hex_dump(&self.expected, self.lba));
        out.push_str("ACTUAL:\n");
        out.push_str(&crate::pattern::hex_dump(&self.actual, self.lba));
        out
    }
}

/// Conditions fatal to the whole run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to allocate {size} byte transfer buffer (alignment {alignment})")]
    Allocation { size: usize, alignment: usize },

    #[error("failed to allocate write bitmap for {blocks} LBAs")]
    BitmapAllocation { blocks: u64 },

    #[error("worker {worker_id} could not open target: {source}")]
    Open {
        worker_id: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_lba() {
        let f = IoFailure::ShortTransfer {
            op: OperationType::Write,
            lba: 42,
            requested: 5120,
            transferred: 512,
        };
        assert_eq!(f.lba(), 42);
        assert!(f.to_string().contains("asked for = 5120"));
    }

    #[test]
    fn test_seek_error_keeps_cause() {
        let f = IoFailure::Seek {
            lba: 8,
            requested: 4096,
            source: std::io::Error::from_raw_os_error(22),
        };
        assert_eq!(f.lba(), 8);
        assert!(f.to_string().contains("requested pos 4096"));
        assert!(std::error::Error::source(&f).is_some());
    }

    #[test]
    fn test_miscompare_failing_lba() {
        let m = Miscompare {
            lba: 10,
            pass: 1,
            worker_id: 0,
            offset: 1030,
            expected: vec![0; 16],
            actual: vec![1; 16],
        };
        assert_eq!(m.failing_lba(), 12);
        let f = IoFailure::Miscompare(Box::new(m));
        assert_eq!(f.lba(), 10);
        assert!(f.to_string().contains("0xa"));
    }
}
