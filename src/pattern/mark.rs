//! Block markers
//!
//! A marker is an 80-byte header overlaid on the start of a block so that data
//! found on the device can be traced back to the run, pass and LBA that wrote it.
//!
//! # Layout
//!
//! ```text
//! 0..8    LBA (big-endian)
//! 8..16   pass count (big-endian)
//! 16..24  run start time in unix seconds, or the alternate marker (big-endian)
//! 24..32  seed (big-endian)
//! 32..48  hostname, NUL padded
//! 48..80  target name (trailing bytes), NUL padded
//! ```

use crate::config::workload::MarkMode;
use crate::BLOCK_SIZE;

/// Bytes of each block covered by a marker
pub const MARKER_LEN: usize = 80;

const HOSTNAME_LEN: usize = 16;
const TARGET_LEN: usize = 32;

/// Run-wide marker fields, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkContext {
    pub stamp: u64,
    pub seed: u64,
    hostname: [u8; HOSTNAME_LEN],
    target: [u8; TARGET_LEN],
}

impl MarkContext {
    /// Build the run-wide marker fields
    ///
    /// Hostnames longer than 16 bytes are truncated; target names longer than
    /// 32 bytes keep their trailing bytes, which carry the distinguishing part
    /// of a device path.
    pub fn new(stamp: u64, seed: u64, hostname: &str, target: &str) -> Self {
        let mut host = [0u8; HOSTNAME_LEN];
        let h = hostname.as_bytes();
        let n = h.len().min(HOSTNAME_LEN);
        host[..n].copy_from_slice(&h[..n]);

        let mut tgt = [0u8; TARGET_LEN];
        let t = target.as_bytes();
        let tail = &t[t.len().saturating_sub(TARGET_LEN)..];
        tgt[..tail.len()].copy_from_slice(tail);

        Self {
            stamp,
            seed,
            hostname: host,
            target: tgt,
        }
    }

    fn stamp_block(&self, block: &mut [u8], lba: u64, pass: u64) {
        let mut header = [0u8; MARKER_LEN];
        header[0..8].copy_from_slice(&lba.to_be_bytes());
        header[8..16].copy_from_slice(&pass.to_be_bytes());
        header[16..24].copy_from_slice(&self.stamp.to_be_bytes());
        header[24..32].copy_from_slice(&self.seed.to_be_bytes());
        header[32..48].copy_from_slice(&self.hostname);
        header[48..80].copy_from_slice(&self.target);

        let n = block.len().min(MARKER_LEN);
        block[..n].copy_from_slice(&header[..n]);
    }
}

/// Overlay markers on a transfer buffer starting at `lba`
pub fn mark(buf: &mut [u8], lba: u64, pass: u64, mode: MarkMode, ctx: &MarkContext) {
    let block = BLOCK_SIZE as usize;
    let blocks = buf.len() / block;
    if blocks == 0 {
        return;
    }

    match mode {
        MarkMode::First => ctx.stamp_block(&mut buf[..block], lba, pass),
        MarkMode::Last => {
            let last = blocks - 1;
            ctx.stamp_block(
                &mut buf[last * block..(last + 1) * block],
                lba + last as u64,
                pass,
            );
        }
        MarkMode::All => {
            for (j, chunk) in buf.chunks_exact_mut(block).enumerate() {
                ctx.stamp_block(chunk, lba + j as u64, pass);
            }
        }
    }
}

/// Decoded marker header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub lba: u64,
    pub pass: u64,
    pub stamp: u64,
    pub seed: u64,
    pub hostname: String,
    pub target: String,
}

impl Marker {
    /// Decode the marker at the start of `block`
    pub fn parse(block: &[u8]) -> Option<Self> {
        if block.len() < MARKER_LEN {
            return None;
        }
        let word = |range: std::ops::Range<usize>| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&block[range]);
            u64::from_be_bytes(bytes)
        };
        let text = |range: std::ops::Range<usize>| {
            let raw = &block[range];
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            String::from_utf8_lossy(&raw[..end]).into_owned()
        };

        Some(Self {
            lba: word(0..8),
            pass: word(8..16),
            stamp: word(16..24),
            seed: word(24..32),
            hostname: text(32..48),
            target: text(48..80),
        })
    }
}
