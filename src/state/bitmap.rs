//! Write bitmap
//!
//! One bit per LBA of the range under test. A bit is set once the write
//! covering that LBA has fully completed and stays set for the rest of the pass;
//! each pass builds a fresh bitmap. Bits are packed most-significant-first within
//! each byte; nothing outside this type depends on the packing.

use crate::error::EngineError;

/// Fixed-size bit set over an inclusive LBA range
#[derive(Debug, Clone)]
pub struct WriteBitmap {
    start: u64,
    len: u64,
    bits: Vec<u8>,
}

impl WriteBitmap {
    /// Bitmap covering `start..=stop`, all bits clear
    ///
    /// Fails instead of aborting when the range is too large to track.
    pub fn new(start: u64, stop: u64) -> Result<Self, EngineError> {
        let len = stop.saturating_sub(start).saturating_add(1);
        let bytes = usize::try_from(len / 8 + 1)
            .map_err(|_| EngineError::BitmapAllocation { blocks: len })?;

        let mut bits = Vec::new();
        bits.try_reserve_exact(bytes)
            .map_err(|_| EngineError::BitmapAllocation { blocks: len })?;
        bits.resize(bytes, 0u8);

        Ok(Self { start, len, bits })
    }

    /// Number of LBAs covered
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.count_set() == 0
    }

    fn index(&self, lba: u64) -> Option<(usize, u8)> {
        let offset = lba.checked_sub(self.start)?;
        if offset >= self.len {
            return None;
        }
        Some(((offset / 8) as usize, 0x80u8 >> (offset % 8)))
    }

    /// Whether the write covering `lba` has completed; false outside the range
    pub fn get(&self, lba: u64) -> bool {
        match self.index(lba) {
            Some((byte, mask)) => self.bits[byte] & mask != 0,
            None => false,
        }
    }

    /// Mark `lba` written; LBAs outside the range are ignored
    pub fn set(&mut self, lba: u64) {
        if let Some((byte, mask)) = self.index(lba) {
            self.bits[byte] |= mask;
        }
    }

    /// Mark `blocks` LBAs starting at `lba` written
    pub fn set_range(&mut self, lba: u64, blocks: u64) {
        for i in 0..blocks {
            self.set(lba + i);
        }
    }

    /// Whether every LBA in `[lba, lba + blocks)` is written
    pub fn is_range_set(&self, lba: u64, blocks: u64) -> bool {
        (0..blocks).all(|i| self.get(lba + i))
    }

    /// Number of LBAs written
    pub fn count_set(&self) -> u64 {
        self.bits.iter().map(|b| b.count_ones() as u64).sum()
    }
}
