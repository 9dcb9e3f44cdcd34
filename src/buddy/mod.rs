//! Buddy Allocator
//!
//! Simulates a binary buddy allocator over a fixed region divided into
//! equal slots. Blocks are powers of two of the slot size and are always
//! aligned to their own size.
//!
//! # Architecture
//!
//! ```text
//! BuddyAllocator
//!   ├─→ Geometry          total size, slot size, level range
//!   ├─→ SlotTable         one record per slot: level, status, label, link
//!   └─→ FreeListRegistry  one LIFO list head per level
//!         ├─→ L22 (4096 KB) → []
//!         ├─→ L21 (2048 KB) → [2048]
//!         └─→ L20 (1024 KB) → [1024]
//! ```
//!
//! Free lists are threaded through the slot table's `next` links, so a free
//! block costs no storage beyond its base slot record.

pub mod allocator;
pub mod free_list;
pub mod geometry;
pub mod report;
pub mod slot;

pub use allocator::{AllocStats, Allocation, Blocks, BuddyAllocator};
pub use free_list::FreeListRegistry;
pub use geometry::{Geometry, Level, KB, MIN_BLOCK_SIZE, TOTAL_MEMORY};
pub use report::{FreeListSummary, MemoryReport, OccupiedBlock};
pub use slot::{Slot, SlotId, SlotStatus, SlotTable};
