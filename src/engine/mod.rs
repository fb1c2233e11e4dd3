//! I/O primitives abstraction
//!
//! The engine never calls a platform I/O primitive directly. Everything it needs
//! from the target goes through two traits:
//!
//! - `IoEngine`: shared by the whole run, opens one handle per worker and
//!   describes the target (name, discovered volume size)
//! - `IoHandle`: owned by a single worker, performs seek/read/write/sync
//!
//! # Engine Types
//!
//! - **File** (`file::FileEngine`): regular files and block devices via `std::fs`,
//!   optionally opened with `O_DIRECT`
//! - **Mock** (`mock::MockEngine`): shared in-memory volume with fault injection,
//!   used by the test suite
//!
//! # Example
//!
//! ```no_run
//! use disktest::engine::{IoEngine, file::FileEngine};
//!
//! let engine = FileEngine::new("/tmp/disktest.img".into(), false);
//! let mut handle = engine.open().unwrap();
//! let pos = handle.seek(4096).unwrap();
//! assert_eq!(pos, 4096);
//! handle.close().unwrap();
//! ```

pub mod file;
pub mod mock;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Factory for per-worker target handles
///
/// # Thread Safety
///
/// The engine is shared by every worker through an `Arc`, so it must be `Send + Sync`.
/// Handles are owned by exactly one worker and only need to be `Send`.
pub trait IoEngine: Send + Sync {
    /// Open a new handle on the target
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be opened. The caller treats this as
    /// fatal to the whole run.
    fn open(&self) -> Result<Box<dyn IoHandle>>;

    /// Size of the target in blocks, if it can be discovered
    fn volume_blocks(&self) -> Result<Option<u64>>;

    /// Human-readable target name (stamped into block markers)
    fn name(&self) -> String;
}

/// An open target handle
///
/// Offsets and lengths are in bytes. Short transfers are returned as-is: the
/// worker loop decides what a short transfer means.
pub trait IoHandle: Send {
    /// Position the handle, returning the position actually reached
    fn seek(&mut self, offset: u64) -> io::Result<u64>;

    /// Read into `buf`, returning the number of bytes read
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `buf`, returning the number of bytes written
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Flush written data to stable storage
    fn sync(&mut self) -> io::Result<()>;

    /// Release the handle
    fn close(&mut self) -> io::Result<()>;
}

/// Type of IO operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Read operation
    Read,
    /// Write operation
    Write,
}

impl OperationType {
    /// The other direction
    pub fn flip(self) -> Self {
        match self {
            OperationType::Read => OperationType::Write,
            OperationType::Write => OperationType::Read,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Read => write!(f, "read"),
            OperationType::Write => write!(f, "write"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_flip() {
        assert_eq!(OperationType::Read.flip(), OperationType::Write);
        assert_eq!(OperationType::Write.flip(), OperationType::Read);
    }

    #[test]
    fn test_operation_type_display() {
        assert_eq!(OperationType::Read.to_string(), "read");
        assert_eq!(OperationType::Write.to_string(), "write");
    }
}
