//! Pattern generator
//!
//! Produces the content of every written transfer and regenerates the expected
//! content of every compared read. All four policies are pure functions of
//! (policy, per-pass random block, LBA), so a reader can rebuild exactly what a
//! writer produced without any shared state:
//!
//! - **Counting**: byte `i` of the transfer is `i mod 256`
//! - **Fixed**: the configured value, leading zero bytes stripped, repeated big-endian
//! - **Random**: one block of seeded pseudo-random bytes, replicated per block
//! - **Lba**: each block filled with its own LBA as a big-endian `u64`
//!
//! Block markers (`mark`) are overlaid afterwards and compose with any policy.
//!
//! # Example
//!
//! ```
//! use disktest::config::workload::FillPattern;
//! use disktest::pattern::PatternGenerator;
//!
//! let generator = PatternGenerator::new(FillPattern::Lba, 42, 1);
//! let mut written = vec![0u8; 1024];
//! generator.fill(&mut written, 7);
//!
//! let mut expected = vec![0u8; 1024];
//! generator.fill(&mut expected, 7);
//! assert_eq!(disktest::pattern::first_mismatch(&expected, &written), None);
//! ```

pub mod mark;

pub use mark::{mark, MarkContext};

use crate::config::workload::FillPattern;
use crate::BLOCK_SIZE;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fmt::Write;

const BLOCK: usize = BLOCK_SIZE as usize;

/// Fill content source for one pass
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    policy: FillPattern,
    /// One block of random content (Random policy only)
    random_block: Vec<u8>,
    fixed: [u8; 8],
}

impl PatternGenerator {
    /// Build the generator for a pass
    ///
    /// The random block is derived from `seed` and `pass`, so every pass writes
    /// different data while a rerun with the same seed writes the same data.
    pub fn new(policy: FillPattern, seed: u64, pass: u64) -> Self {
        let random_block = match policy {
            FillPattern::Random => {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed ^ pass.rotate_left(32));
                let mut block = vec![0u8; BLOCK];
                rng.fill_bytes(&mut block);
                block
            }
            _ => Vec::new(),
        };
        let fixed = match policy {
            FillPattern::Fixed(value) => normalize_fixed(value),
            _ => [0u8; 8],
        };

        Self {
            policy,
            random_block,
            fixed,
        }
    }

    /// Fill `buf` with the content for a transfer starting at `lba`
    pub fn fill(&self, buf: &mut [u8], lba: u64) {
        match self.policy {
            FillPattern::Counting => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    *byte = (i % 256) as u8;
                }
            }
            FillPattern::Fixed(_) => {
                for chunk in buf.chunks_mut(8) {
                    chunk.copy_from_slice(&self.fixed[..chunk.len()]);
                }
            }
            FillPattern::Random => {
                for chunk in buf.chunks_mut(BLOCK) {
                    chunk.copy_from_slice(&self.random_block[..chunk.len()]);
                }
            }
            FillPattern::Lba => {
                for (j, block) in buf.chunks_mut(BLOCK).enumerate() {
                    let word = (lba + j as u64).to_be_bytes();
                    for chunk in block.chunks_mut(8) {
                        chunk.copy_from_slice(&word[..chunk.len()]);
                    }
                }
            }
        }
    }
}

/// Normalize a fixed pattern value into the 8-byte word repeated across buffers
///
/// Leading zero bytes are dropped and the significant bytes are repeated as many
/// whole times as fit in eight bytes; the rest of the word stays zero.
pub fn normalize_fixed(value: u64) -> [u8; 8] {
    let bytes = value.to_be_bytes();
    let leading = bytes.iter().take_while(|&&b| b == 0).count();
    if leading == 8 {
        return [0u8; 8];
    }

    let significant = &bytes[leading..];
    let len = significant.len();
    let mut word = [0u8; 8];
    for rep in 0..(8 / len) {
        word[rep * len..(rep + 1) * len].copy_from_slice(significant);
    }
    word
}

/// Offset of the first differing byte, if any
pub fn first_mismatch(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected
        .iter()
        .zip(actual.iter())
        .position(|(e, a)| e != a)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())))
}

/// Hex dump of `buf`, one 16-byte row per line, prefixed by LBA and byte offset
pub fn hex_dump(buf: &[u8], base_lba: u64) -> String {
    let mut out = String::with_capacity(buf.len() * 4);
    for (row, chunk) in buf.chunks(16).enumerate() {
        let offset = row * 16;
        let lba = base_lba + (offset / BLOCK) as u64;
        let _ = write!(out, "{:>10x} {:04x}:", lba, offset % BLOCK);
        for byte in chunk {
            let _ = write!(out, " {:02x}", byte);
        }
        out.push('\n');
    }
    out
}
