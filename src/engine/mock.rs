//! Mock IO engine for testing
//!
//! An in-memory volume shared by every handle the engine opens, so that
//! concurrent workers observe each other's writes exactly as they would on a
//! real device. Faults can be injected to exercise the failure paths.
//!
//! # Features
//!
//! - Shared in-memory volume sized in blocks
//! - Seek skew (seeks land off target) and seek errors
//! - Short transfers (each transfer capped at a byte count)
//! - Transfer errors and open failures
//! - Byte corruption, immediately or after the N-th write
//! - Tracks all submitted operations
//!
//! # Example
//!
//! ```
//! use disktest::engine::IoEngine;
//! use disktest::engine::mock::MockEngine;
//!
//! let engine = MockEngine::new(16);
//! let mut handle = engine.open().unwrap();
//! handle.seek(512).unwrap();
//! assert_eq!(handle.write(&[7u8; 512]).unwrap(), 512);
//! assert_eq!(engine.storage()[512], 7);
//! ```

use super::{IoEngine, IoHandle, OperationType};
use crate::{Result, BLOCK_SIZE};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

/// Record of a submitted operation for testing verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub op_type: OperationType,
    pub offset: u64,
    pub length: usize,
}

#[derive(Debug, Default)]
struct Faults {
    seek_skew: u64,
    seek_fail: bool,
    /// 0 means full transfers
    short_transfer: usize,
    should_fail: bool,
    fail_open: bool,
    /// (write count that triggers it, byte offset)
    corrupt_after_writes: Option<(usize, usize)>,
}

#[derive(Debug, Default)]
struct Shared {
    storage: Vec<u8>,
    faults: Faults,
    ops: Vec<OperationRecord>,
    writes: usize,
    opened: usize,
}

/// Mock IO engine for testing
///
/// Cloning the engine shares the volume and fault settings.
#[derive(Clone)]
pub struct MockEngine {
    shared: Arc<Mutex<Shared>>,
    name: String,
}

impl MockEngine {
    /// Create a zero-filled volume of `blocks` blocks
    pub fn new(blocks: u64) -> Self {
        let shared = Shared {
            storage: vec![0u8; (blocks * BLOCK_SIZE) as usize],
            ..Default::default()
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
            name: "mock".to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every seek land `bytes` beyond the requested position
    pub fn set_seek_skew(&self, bytes: u64) {
        self.lock().faults.seek_skew = bytes;
    }

    /// Fail every seek with an I/O error
    pub fn set_seek_fail(&self, fail: bool) {
        self.lock().faults.seek_fail = fail;
    }

    /// Cap every read and write at `bytes` (0 restores full transfers)
    pub fn set_short_transfer(&self, bytes: usize) {
        self.lock().faults.short_transfer = bytes;
    }

    /// Fail every read and write with an I/O error
    pub fn set_should_fail(&self, should_fail: bool) {
        self.lock().faults.should_fail = should_fail;
    }

    /// Fail every subsequent `open`
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().faults.fail_open = fail;
    }

    /// Flip every bit of the byte at `offset` once `writes` writes have completed
    pub fn corrupt_after_writes(&self, writes: usize, offset: usize) {
        self.lock().faults.corrupt_after_writes = Some((writes, offset));
    }

    /// Flip every bit of the byte at `offset` now
    pub fn corrupt_byte(&self, offset: usize) {
        let mut shared = self.lock();
        if let Some(byte) = shared.storage.get_mut(offset) {
            *byte = !*byte;
        }
    }

    /// Copy of the volume contents
    pub fn storage(&self) -> Vec<u8> {
        self.lock().storage.clone()
    }

    /// All operations submitted so far, in submission order
    pub fn operations(&self) -> Vec<OperationRecord> {
        self.lock().ops.clone()
    }

    /// Number of handles opened so far
    pub fn open_count(&self) -> usize {
        self.lock().opened
    }
}

impl IoEngine for MockEngine {
    fn open(&self) -> Result<Box<dyn IoHandle>> {
        let mut shared = self.lock();
        if shared.faults.fail_open {
            anyhow::bail!("Mock open failure");
        }
        shared.opened += 1;
        Ok(Box::new(MockHandle {
            shared: Arc::clone(&self.shared),
            position: 0,
            closed: false,
        }))
    }

    fn volume_blocks(&self) -> Result<Option<u64>> {
        Ok(Some(self.lock().storage.len() as u64 / BLOCK_SIZE))
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Handle onto the shared mock volume
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
    position: u64,
    closed: bool,
}

impl MockHandle {
    fn lock(&self) -> io::Result<MutexGuard<'_, Shared>> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, "handle is closed"));
        }
        Ok(self.shared.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Clamp a transfer to the fault cap and the end of the volume
    fn transfer_len(shared: &Shared, position: u64, requested: usize) -> usize {
        let mut len = requested;
        if shared.faults.short_transfer > 0 {
            len = len.min(shared.faults.short_transfer);
        }
        let remaining = (shared.storage.len() as u64).saturating_sub(position) as usize;
        len.min(remaining)
    }
}

impl IoHandle for MockHandle {
    fn seek(&mut self, offset: u64) -> io::Result<u64> {
        let (fail, skew) = {
            let shared = self.lock()?;
            (shared.faults.seek_fail, shared.faults.seek_skew)
        };
        if fail {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "Mock seek error"));
        }
        self.position = offset + skew;
        Ok(self.position)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.position;
        let mut shared = self.lock()?;
        if shared.faults.should_fail {
            return Err(io::Error::new(io::ErrorKind::Other, "Mock IO error"));
        }
        shared.ops.push(OperationRecord {
            op_type: OperationType::Read,
            offset: position,
            length: buf.len(),
        });

        let len = Self::transfer_len(&shared, position, buf.len());
        if len == 0 {
            return Ok(0);
        }
        let start = position as usize;
        buf[..len].copy_from_slice(&shared.storage[start..start + len]);
        drop(shared);
        self.position += len as u64;
        Ok(len)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let position = self.position;
        let mut shared = self.lock()?;
        if shared.faults.should_fail {
            return Err(io::Error::new(io::ErrorKind::Other, "Mock IO error"));
        }
        shared.ops.push(OperationRecord {
            op_type: OperationType::Write,
            offset: position,
            length: buf.len(),
        });

        let len = Self::transfer_len(&shared, position, buf.len());
        if len == 0 {
            return Ok(0);
        }
        let start = position as usize;
        shared.storage[start..start + len].copy_from_slice(&buf[..len]);
        shared.writes += 1;

        if let Some((after, offset)) = shared.faults.corrupt_after_writes {
            if shared.writes == after {
                if let Some(byte) = shared.storage.get_mut(offset) {
                    *byte = !*byte;
                }
                shared.faults.corrupt_after_writes = None;
            }
        }
        drop(shared);
        self.position += len as u64;
        Ok(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        let shared = self.lock()?;
        if shared.faults.should_fail {
            return Err(io::Error::new(io::ErrorKind::Other, "Mock sync error"));
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}
