//! Slot table for the buddy allocator

use super::geometry::Level;
use serde::Serialize;
use std::fmt;

/// Index of a slot in the simulated region
pub type SlotId = usize;

/// Occupancy of a block, recorded on its base slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Free,
    Occupied,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Free => write!(f, "free"),
            SlotStatus::Occupied => write!(f, "occupied"),
        }
    }
}

/// Per-slot record
///
/// Only the base slot of a block carries meaningful values. Slots inside a
/// multi-slot block keep whatever they held before the block was formed.
#[derive(Debug, Clone)]
pub struct Slot {
    /// Level of the block based here
    pub level: Level,
    /// Whether the block based here is handed out
    pub status: SlotStatus,
    /// Owner label (occupied blocks only)
    pub label: char,
    /// Size the owner asked for, in KB (occupied blocks only)
    pub requested_kb: i64,
    /// Next free block of the same level (free blocks only)
    pub next: Option<SlotId>,
}

impl Slot {
    /// Create a blank free slot at `level`
    pub fn new(level: Level) -> Self {
        Self {
            level,
            status: SlotStatus::Free,
            label: ' ',
            requested_kb: 0,
            next: None,
        }
    }

    /// Hand this block to `label`
    pub fn occupy(&mut self, label: char, requested_kb: i64) {
        self.status = SlotStatus::Occupied;
        self.label = label;
        self.requested_kb = requested_kb;
    }

    pub fn is_free(&self) -> bool {
        self.status == SlotStatus::Free
    }
}

/// Fixed-length store of slot records, indexed by [`SlotId`]
///
/// Pure storage: it knows nothing about splitting or free lists.
#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: Vec<Slot>,
}

impl SlotTable {
    /// Create a table of `len` blank slots at `min_level`, with slot 0
    /// raised to `max_level` so it describes the whole region.
    pub fn new(len: usize, min_level: Level, max_level: Level) -> Self {
        let mut slots = vec![Slot::new(min_level); len];
        if let Some(first) = slots.first_mut() {
            first.level = max_level;
        }
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }

    pub fn get_mut(&mut self, id: SlotId) -> &mut Slot {
        &mut self.slots[id]
    }

    pub fn level(&self, id: SlotId) -> Level {
        self.slots[id].level
    }

    pub fn set_level(&mut self, id: SlotId, level: Level) {
        self.slots[id].level = level;
    }

    pub fn next(&self, id: SlotId) -> Option<SlotId> {
        self.slots[id].next
    }

    pub fn set_next(&mut self, id: SlotId, next: Option<SlotId>) {
        self.slots[id].next = next;
    }
}
