//! Aligned transfer buffers
//!
//! Buffers handed to the target must be aligned for `O_DIRECT`. Each worker owns
//! two of them (the transfer buffer and the expected-data buffer) for its whole
//! lifetime, so allocation happens once, before the first transfer.

use crate::error::EngineError;
use std::alloc::{alloc_zeroed, dealloc, Layout};

/// Alignment that satisfies `O_DIRECT` on every common device
pub const DEFAULT_ALIGNMENT: usize = 4096;

/// Memory-aligned buffer suitable for O_DIRECT operations
pub struct AlignedBuffer {
    ptr: *mut u8,
    size: usize,
    alignment: usize,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocate a zeroed buffer
    ///
    /// # Arguments
    /// * `size` - Size of the buffer in bytes
    /// * `alignment` - Alignment requirement (power of two)
    ///
    /// # Errors
    /// Returns `EngineError::Allocation` if the layout is invalid or the allocator
    /// is out of memory.
    pub fn try_new(size: usize, alignment: usize) -> Result<Self, EngineError> {
        let failed = || EngineError::Allocation { size, alignment };

        if size == 0 {
            return Err(failed());
        }
        let layout = Layout::from_size_align(size, alignment).map_err(|_| failed())?;

        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(failed());
        }

        Ok(AlignedBuffer {
            ptr,
            size,
            alignment,
            layout,
        })
    }

    /// Get the buffer as a slice
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.size) }
    }

    /// Get the buffer as a mutable slice
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.size) }
    }

    /// Get the size of the buffer in bytes
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the alignment of the buffer
    #[inline(always)]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Verify that the buffer is properly aligned
    #[inline(always)]
    pub fn is_aligned(&self) -> bool {
        (self.ptr as usize) % self.alignment == 0
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe {
            dealloc(self.ptr, self.layout);
        }
    }
}

// AlignedBuffer is Send because it owns its memory
unsafe impl Send for AlignedBuffer {}
