//! disktest - concurrent disk exerciser
//!
//! disktest drives a pool of worker threads against one target (file or block
//! device), deciding for every transfer which logical block to read or write next,
//! performing the transfer, and verifying that previously written data reads back
//! unchanged.
//!
//! # Architecture
//!
//! - **Pattern generator** (`pattern`): deterministic fill content and block markers
//! - **Shared test state** (`state`): cursors, write bitmap, stats, stop flags
//! - **Action scheduler** (`scheduler`): next {operation, transfer size, LBA}
//! - **Worker loop** (`worker`): per-thread I/O cycle and verification
//! - **Duration controller** (`timer`): run time bound, heartbeats, stop
//! - **Coordinator** (`coordinator`): passes, thread lifecycle, rollups
//!
//! I/O goes through the `engine` traits, so the engine itself never touches a
//! platform primitive directly.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod output;
pub mod pattern;
pub mod scheduler;
pub mod state;
pub mod stats;
pub mod timer;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{RunSummary, TestRun};
pub use engine::IoEngine;

/// Result type used throughout disktest
pub type Result<T> = anyhow::Result<T>;

/// Size of one logical block in bytes
pub const BLOCK_SIZE: u64 = 512;
