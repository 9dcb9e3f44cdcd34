//! Per-level free lists
//!
//! Each level keeps a singly linked LIFO list of free block bases. The
//! links live in the [`SlotTable`] itself (`Slot::next`), so the registry
//! only stores one head per level:
//!
//! ```text
//! heads[L]
//!    │
//!    ▼
//! ┌──────┐ next ┌──────┐ next ┌──────┐
//! │ slot │ ───► │ slot │ ───► │ slot │ ───► None
//! └──────┘      └──────┘      └──────┘
//! ```

use super::geometry::Level;
use super::slot::{SlotId, SlotStatus, SlotTable};

/// One list head per level, indexed by `level - min_level`
#[derive(Debug, Clone)]
pub struct FreeListRegistry {
    min_level: Level,
    heads: Vec<Option<SlotId>>,
}

impl FreeListRegistry {
    /// Create `level_count` empty lists starting at `min_level`.
    pub fn new(min_level: Level, level_count: usize) -> Self {
        Self {
            min_level,
            heads: vec![None; level_count],
        }
    }

    fn index(&self, level: Level) -> usize {
        (level - self.min_level) as usize
    }

    /// Slot at the head of the list for `level`, if any.
    pub fn head(&self, level: Level) -> Option<SlotId> {
        self.heads[self.index(level)]
    }

    pub fn is_empty(&self, level: Level) -> bool {
        self.head(level).is_none()
    }

    /// Mark `id` free and make it the new head of the list for `level`.
    pub fn push(&mut self, slots: &mut SlotTable, id: SlotId, level: Level) {
        let index = self.index(level);
        let slot = slots.get_mut(id);
        slot.status = SlotStatus::Free;
        slot.next = self.heads[index];
        self.heads[index] = Some(id);
    }

    /// Detach the head of the list for `level`.
    ///
    /// Only the head can ever be removed; there is no removal by id.
    pub fn pop_head(&mut self, slots: &mut SlotTable, level: Level) -> Option<SlotId> {
        let index = self.index(level);
        let id = self.heads[index]?;
        self.heads[index] = slots.next(id);
        slots.set_next(id, None);
        Some(id)
    }

    /// Walk the list for `level` from head to tail.
    pub fn iter<'a>(&self, slots: &'a SlotTable, level: Level) -> Iter<'a> {
        Iter {
            slots,
            current: self.head(level),
        }
    }

    /// Levels covered by this registry, smallest first.
    pub fn levels(&self) -> impl Iterator<Item = Level> {
        let min = self.min_level;
        (0..self.heads.len() as Level).map(move |offset| min + offset)
    }
}

/// Iterator over the slot ids of one free list
pub struct Iter<'a> {
    slots: &'a SlotTable,
    current: Option<SlotId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = SlotId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.slots.next(id);
        Some(id)
    }
}
