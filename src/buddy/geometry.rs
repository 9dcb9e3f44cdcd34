//! Memory geometry
//!
//! Describes the simulated region: its total size, the size of one slot
//! (the smallest block) and the range of levels in between. A level is the
//! base-2 logarithm of a block size in bytes, so with 1 KB slots the
//! smallest level is 10.

use crate::error::{Error, Result};
use serde::Serialize;

/// Total managed memory in bytes (4 MB)
pub const TOTAL_MEMORY: u64 = 4 * 1024 * 1024;

/// Size of one slot in bytes (1 KB)
pub const MIN_BLOCK_SIZE: u64 = 1024;

/// Bytes per KB; all sizes at the edges of the simulator are in KB.
pub const KB: u64 = 1024;

/// Log2-scaled size class of a block.
pub type Level = u32;

/// Fixed layout of the simulated memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    total_bytes: u64,
    min_block_bytes: u64,
    min_level: Level,
    max_level: Level,
}

impl Geometry {
    /// Create a geometry for `total_bytes` of memory split into
    /// `min_block_bytes` slots.
    ///
    /// Both sizes must be powers of two, the slot must hold at least one KB
    /// and the region must hold at least one slot.
    pub fn new(total_bytes: u64, min_block_bytes: u64) -> Result<Self> {
        if !total_bytes.is_power_of_two() {
            return Err(Error::Config(format!(
                "total memory {} bytes is not a power of two",
                total_bytes
            )));
        }
        if !min_block_bytes.is_power_of_two() || min_block_bytes < KB {
            return Err(Error::Config(format!(
                "minimum block {} bytes must be a power of two of at least {} bytes",
                min_block_bytes, KB
            )));
        }
        if total_bytes < min_block_bytes {
            return Err(Error::Config(format!(
                "total memory {} bytes is smaller than the minimum block {} bytes",
                total_bytes, min_block_bytes
            )));
        }

        Ok(Self {
            total_bytes,
            min_block_bytes,
            min_level: min_block_bytes.trailing_zeros(),
            max_level: total_bytes.trailing_zeros(),
        })
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn total_kb(&self) -> u64 {
        self.total_bytes / KB
    }

    pub fn min_block_bytes(&self) -> u64 {
        self.min_block_bytes
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn max_level(&self) -> Level {
        self.max_level
    }

    /// Number of levels, and therefore of free lists
    pub fn level_count(&self) -> usize {
        (self.max_level - self.min_level) as usize + 1
    }

    /// Number of slots in the region
    pub fn total_slots(&self) -> usize {
        (self.total_bytes / self.min_block_bytes) as usize
    }

    /// Index of `level` in per-level tables.
    pub fn level_index(&self, level: Level) -> usize {
        debug_assert!(level >= self.min_level && level <= self.max_level);
        (level - self.min_level) as usize
    }

    /// Block size at `level`, counted in slots.
    pub fn slots_at(&self, level: Level) -> usize {
        1usize << (level - self.min_level)
    }

    /// Block size at `level`, in KB.
    pub fn block_kb(&self, level: Level) -> u64 {
        (self.min_block_bytes / KB) << (level - self.min_level)
    }

    /// Smallest level whose block holds `size_kb`.
    ///
    /// Sizes of zero or less map to the smallest level. Requests larger
    /// than the whole region are clamped to the top level; the block handed
    /// out is then smaller than what was asked for.
    pub fn target_level(&self, size_kb: i64) -> Level {
        if size_kb <= 0 {
            return self.min_level;
        }

        let wanted = (size_kb as u64).saturating_mul(KB);
        let mut level = self.min_level;
        let mut size = self.min_block_bytes;

        while size < wanted {
            size = size.saturating_mul(2);
            level += 1;
            if level > self.max_level {
                return self.max_level;
            }
        }

        level
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            total_bytes: TOTAL_MEMORY,
            min_block_bytes: MIN_BLOCK_SIZE,
            min_level: MIN_BLOCK_SIZE.trailing_zeros(),
            max_level: TOTAL_MEMORY.trailing_zeros(),
        }
    }
}
