//! Buddy allocator implementation

use super::free_list::FreeListRegistry;
use super::geometry::{Geometry, Level};
use super::slot::{Slot, SlotId, SlotTable};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// A block handed out by [`BuddyAllocator::allocate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub label: char,
    /// Size asked for, in KB
    pub requested_kb: i64,
    /// Size of the block actually handed out, in KB
    pub block_kb: u64,
    /// Base slot of the block
    pub slot: SlotId,
    pub level: Level,
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Program {} ({} KB). Block: {} KB. Slot: {}",
            self.label, self.requested_kb, self.block_kb, self.slot
        )
    }
}

/// Counters kept across the lifetime of an allocator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocStats {
    /// Number of allocation requests seen
    pub requests: u64,
    /// Requests that got a block
    pub allocations: u64,
    /// Requests that found no suitable block
    pub failures: u64,
    /// Blocks split in half while serving requests
    pub splits: u64,
    /// KB asked for by successful requests
    pub requested_kb: i64,
    /// KB handed out to successful requests
    pub allocated_kb: u64,
}

impl AllocStats {
    /// KB handed out beyond what was asked for.
    ///
    /// Saturates at zero when oversize requests were clamped to a smaller
    /// block.
    pub fn internal_fragmentation_kb(&self) -> u64 {
        (self.allocated_kb as i64 - self.requested_kb).max(0) as u64
    }
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Requests:               {}", self.requests)?;
        writeln!(f, "Allocations:            {}", self.allocations)?;
        writeln!(f, "Failures:               {}", self.failures)?;
        writeln!(f, "Splits:                 {}", self.splits)?;
        writeln!(f, "Requested (KB):         {}", self.requested_kb)?;
        writeln!(f, "Allocated (KB):         {}", self.allocated_kb)?;
        writeln!(
            f,
            "Internal waste (KB):    {}",
            self.internal_fragmentation_kb()
        )
    }
}

/// Binary buddy allocator over a simulated region
///
/// The region starts as one free block at the top level. Requests split
/// free blocks in half until a block of the right level is isolated; the
/// other half of every split (the buddy) goes onto the free list one level
/// down. Blocks are never freed or merged.
pub struct BuddyAllocator {
    geometry: Geometry,
    slots: SlotTable,
    free_lists: FreeListRegistry,
    stats: AllocStats,
}

impl BuddyAllocator {
    /// Create an allocator with the default 4 MB / 1 KB geometry
    pub fn new() -> Self {
        Self::with_geometry(Geometry::default())
    }

    /// Create an allocator for the given geometry
    pub fn with_geometry(geometry: Geometry) -> Self {
        let mut slots = SlotTable::new(
            geometry.total_slots(),
            geometry.min_level(),
            geometry.max_level(),
        );
        let mut free_lists = FreeListRegistry::new(geometry.min_level(), geometry.level_count());
        free_lists.push(&mut slots, 0, geometry.max_level());

        info!(
            total_kb = geometry.total_kb(),
            slots = geometry.total_slots(),
            levels = geometry.level_count(),
            "Buddy allocator initialized"
        );

        Self {
            geometry,
            slots,
            free_lists,
            stats: AllocStats::default(),
        }
    }

    /// Allocate a block holding `size_kb` for `label`
    ///
    /// Searches the free lists from the target level upwards and takes the
    /// head of the first non-empty one. On failure nothing but the request
    /// counters changes.
    pub fn allocate(&mut self, size_kb: i64, label: char) -> Result<Allocation> {
        self.stats.requests += 1;

        let target = self.geometry.target_level(size_kb);
        let found = (target..=self.geometry.max_level())
            .find_map(|level| self.free_lists.head(level).map(|slot| (slot, level)));

        let Some((base, found_level)) = found else {
            self.stats.failures += 1;
            warn!(%label, size_kb, target_level = target, "No suitable free block");
            return Err(Error::OutOfMemory { label, size_kb });
        };

        let detached = self.free_lists.pop_head(&mut self.slots, found_level);
        debug_assert_eq!(detached, Some(base));

        // Keep the lower half, hand the upper half (the buddy) to the
        // free list one level down.
        let mut level = found_level;
        while level > target {
            level -= 1;
            let buddy = base + self.geometry.slots_at(level);

            self.slots.set_level(base, level);
            self.slots.set_level(buddy, level);
            self.free_lists.push(&mut self.slots, buddy, level);

            self.stats.splits += 1;
            debug!(base, buddy, level, "Split block");
        }

        self.slots.get_mut(base).occupy(label, size_kb);

        let block_kb = self.geometry.block_kb(target);
        self.stats.allocations += 1;
        self.stats.requested_kb += size_kb;
        self.stats.allocated_kb += block_kb;

        let allocation = Allocation {
            label,
            requested_kb: size_kb,
            block_kb,
            slot: base,
            level: target,
        };
        info!(%label, size_kb, block_kb, slot = base, "Allocated block");

        Ok(allocation)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn free_lists(&self) -> &FreeListRegistry {
        &self.free_lists
    }

    /// Returns a copy of the counters at the moment.
    pub fn stats(&self) -> AllocStats {
        self.stats.clone()
    }

    /// Walk the block bases in address order.
    ///
    /// Starts at slot 0 and strides by each block's size, so only slots
    /// that begin a block are ever visited.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            geometry: &self.geometry,
            slots: &self.slots,
            next: 0,
        }
    }

    /// Verify the partition and free-list invariants.
    ///
    /// Checks that blocks are aligned and sum to the region size, and that
    /// every free-list entry is a distinct free block base at its list's
    /// level, with no free block missing from the lists.
    pub fn check_invariants(&self) -> Result<()> {
        let mut total_kb = 0;
        let mut free_blocks = HashMap::new();

        for (id, slot) in self.blocks() {
            if id % self.geometry.slots_at(slot.level) != 0 {
                return Err(Error::Internal(format!(
                    "block at slot {} is not aligned to level {}",
                    id, slot.level
                )));
            }
            total_kb += self.geometry.block_kb(slot.level);
            if slot.is_free() {
                free_blocks.insert(id, slot.level);
            }
        }

        if total_kb != self.geometry.total_kb() {
            return Err(Error::Internal(format!(
                "blocks cover {} KB of {} KB",
                total_kb,
                self.geometry.total_kb()
            )));
        }

        let mut listed = HashSet::new();
        for level in self.free_lists.levels() {
            for id in self.free_lists.iter(&self.slots, level) {
                if !listed.insert(id) {
                    return Err(Error::Internal(format!(
                        "slot {} appears more than once in the free lists",
                        id
                    )));
                }
                if free_blocks.get(&id) != Some(&level) {
                    return Err(Error::Internal(format!(
                        "slot {} is listed at level {} but is not a free block there",
                        id, level
                    )));
                }
            }
        }

        if listed.len() != free_blocks.len() {
            return Err(Error::Internal(format!(
                "{} free blocks but {} free-list entries",
                free_blocks.len(),
                listed.len()
            )));
        }

        Ok(())
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(base slot, record)` for every block in the region
pub struct Blocks<'a> {
    geometry: &'a Geometry,
    slots: &'a SlotTable,
    next: SlotId,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = (SlotId, &'a Slot);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.slots.len() {
            return None;
        }

        let id = self.next;
        let slot = self.slots.get(id);
        self.next += self.geometry.slots_at(slot.level);
        Some((id, slot))
    }
}
