//! Shared ring cache of decoded frame buffers.
//!
//! Decoded diffraction frames are large (a 16-bit 2k×2k detector frame
//! expands to 16 MB of `f32`), so records never each hold their own pixels.
//! Instead all records of a series share one [`FrameCache`] with a fixed
//! number of slots, and a record only remembers *which* slot last held its
//! data.
//!
//! # Design
//!
//! The cache is a plain **write-order ring**, not an LRU:
//!
//! - [`store`](FrameCache::store) claims the slot under the cursor, overwrites
//!   it unconditionally, advances the cursor, and returns the slot index.
//!   Claiming and writing happen inside one critical section, so two
//!   concurrent stores can never interleave and leave a slot with one
//!   caller's path and the other's pixels.
//! - Eviction is implicit: after `capacity` further stores a slot has been
//!   reused and its previous owner is silently orphaned. Browsing a series is
//!   a sequential sweep, so oldest-write-first matches the access pattern
//!   without any per-read bookkeeping.
//! - Reads never mutate. A record validates its remembered slot with
//!   [`is_valid`](FrameCache::is_valid) / [`lookup`](FrameCache::lookup):
//!   the slot is good only while its owning path still equals the record's
//!   path. An orphaned record simply decodes again.
//!
//! Pixel buffers are `Arc<[f32]>`: a record that adopted a buffer keeps it
//! alive even after the slot is recycled, so eviction can never invalidate
//! data a caller is still looking at.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Slot count used by [`FrameCache::default`]. Ten frames is enough to flip
/// between neighbouring frames of a scan without re-decoding.
pub const DEFAULT_SLOTS: usize = 10;

struct Slot {
    path: PathBuf,
    pixels: Arc<[f32]>,
}

struct Ring {
    slots: Vec<Option<Slot>>,
    cursor: usize,
}

/// Fixed-capacity ring of decoded frames, shared by every record.
pub struct FrameCache {
    ring: Mutex<Ring>,
}

impl FrameCache {
    /// Create a cache with `slots` entries. A slot count of zero is clamped
    /// to one so `store` always has somewhere to write.
    pub fn new(slots: usize) -> Self {
        let capacity = slots.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            ring: Mutex::new(Ring { slots, cursor: 0 }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().slots.len()
    }

    /// Number of slots currently holding a frame. Never exceeds capacity.
    pub fn occupied(&self) -> usize {
        self.ring.lock().slots.iter().flatten().count()
    }

    /// Claim the next ring slot for `path` and write `pixels` into it,
    /// returning the slot index. Whatever the slot held before is dropped
    /// (records only borrow buffers through `Arc`, so an evicted buffer
    /// stays alive for anyone still holding it).
    pub fn store(&self, path: &Path, pixels: Arc<[f32]>) -> usize {
        let mut ring = self.ring.lock();
        let index = ring.cursor;
        ring.slots[index] = Some(Slot {
            path: path.to_path_buf(),
            pixels,
        });
        ring.cursor = (index + 1) % ring.slots.len();
        index
    }

    /// Does `index` still hold the frame for `path`?
    pub fn is_valid(&self, index: usize, path: &Path) -> bool {
        let ring = self.ring.lock();
        matches!(ring.slots.get(index), Some(Some(slot)) if slot.path == path)
    }

    /// Validity-checked read: the buffer at `index`, but only while that
    /// slot is still owned by `path`. Out-of-range indices are a miss.
    pub fn lookup(&self, index: usize, path: &Path) -> Option<Arc<[f32]>> {
        let ring = self.ring.lock();
        match ring.slots.get(index) {
            Some(Some(slot)) if slot.path == path => Some(Arc::clone(&slot.pixels)),
            _ => None,
        }
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new(DEFAULT_SLOTS)
    }
}
