//! Final memory report
//!
//! A [`MemoryReport`] is a snapshot of the allocator: the occupied blocks in
//! address order, the free-space summary, and a dump of every free list.
//! Generating it never touches allocator state, so two reports taken
//! without an allocation in between are equal.

use super::allocator::BuddyAllocator;
use super::geometry::Level;
use super::slot::{SlotId, SlotStatus};
use serde::Serialize;
use std::fmt;

const RULE: &str = "--------------------------------------------------";
const DOUBLE_RULE: &str = "==================================================";

/// One occupied block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupiedBlock {
    pub label: char,
    pub requested_kb: i64,
    pub block_kb: u64,
    pub slot: SlotId,
}

/// Contents of the free list for one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeListSummary {
    pub level: Level,
    pub block_kb: u64,
    /// Slot ids in list order (most recently freed first)
    pub slots: Vec<SlotId>,
}

/// Snapshot of the allocator's memory layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryReport {
    pub total_kb: u64,
    pub occupied: Vec<OccupiedBlock>,
    pub free_kb: u64,
    pub free_fragments: usize,
    pub free_lists: Vec<FreeListSummary>,
}

impl MemoryReport {
    /// Build a report from the allocator's current state
    pub fn generate(allocator: &BuddyAllocator) -> Self {
        let geometry = allocator.geometry();

        let mut occupied = Vec::new();
        let mut free_kb = 0;
        let mut free_fragments = 0;

        for (id, slot) in allocator.blocks() {
            let block_kb = geometry.block_kb(slot.level);
            match slot.status {
                SlotStatus::Occupied => occupied.push(OccupiedBlock {
                    label: slot.label,
                    requested_kb: slot.requested_kb,
                    block_kb,
                    slot: id,
                }),
                SlotStatus::Free => {
                    free_kb += block_kb;
                    free_fragments += 1;
                }
            }
        }

        let free_lists = allocator
            .free_lists()
            .levels()
            .map(|level| FreeListSummary {
                level,
                block_kb: geometry.block_kb(level),
                slots: allocator
                    .free_lists()
                    .iter(allocator.slots(), level)
                    .collect(),
            })
            .collect();

        Self {
            total_kb: geometry.total_kb(),
            occupied,
            free_kb,
            free_fragments,
            free_lists,
        }
    }
}

impl fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", DOUBLE_RULE)?;
        writeln!(f, "                  FINAL REPORT")?;
        writeln!(f, "{}", DOUBLE_RULE)?;

        writeln!(f, "\n[1] Allocated blocks:")?;
        writeln!(f, "{}", RULE)?;
        writeln!(
            f,
            "{:<6} | {:<14} | {:<15} | {:<12}",
            "Label", "Requested (KB)", "Block (KB)", "Base slot"
        )?;
        writeln!(f, "{}", RULE)?;
        for block in &self.occupied {
            writeln!(
                f,
                "{:<6} | {:<14} | {:<15} | {:<12}",
                block.label, block.requested_kb, block.block_kb, block.slot
            )?;
        }
        writeln!(f, "{}", RULE)?;

        writeln!(f, "\n[2] Free memory summary:")?;
        writeln!(f, "Total free: {} KB", self.free_kb)?;
        writeln!(f, "Free blocks (fragments): {}", self.free_fragments)?;

        writeln!(f, "\n[3] Free fragments by free list:")?;
        for list in &self.free_lists {
            write!(f, "  Level {} ({} KB): ", list.level, list.block_kb)?;
            for slot in &list.slots {
                write!(f, "[{}] ", slot)?;
            }
            writeln!(f, " (Total: {})", list.slots.len())?;
        }

        writeln!(f, "{}", DOUBLE_RULE)
    }
}

impl BuddyAllocator {
    /// Snapshot the current layout, see [`MemoryReport::generate`].
    pub fn report(&self) -> MemoryReport {
        MemoryReport::generate(self)
    }
}
