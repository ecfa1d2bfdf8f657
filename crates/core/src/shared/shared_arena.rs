use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::shared::constants::MIN_ARENA_SLOTS;
use crate::shared::frame::Frame;

/// Reference to a frame stored in a [`SharedArena`].
///
/// Handles are plain data and cross the record channel by value. A handle
/// goes stale once its slot is released or evicted; resolving a stale handle
/// yields `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArenaHandle {
    slot: u32,
    generation: u32,
}

impl ArenaHandle {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Default)]
struct Slot {
    generation: u32,
    frame: Option<Arc<Frame>>,
}

struct ArenaInner {
    slots: Vec<Slot>,
    /// Occupied slots, oldest first.
    occupied: VecDeque<usize>,
    free: Vec<usize>,
    spare_buffers: Vec<Vec<u8>>,
    evictions: u64,
}

impl ArenaInner {
    fn recycle(&mut self, frame: Arc<Frame>) {
        // Only reclaim the buffer when no consumer still holds the frame.
        if let Ok(frame) = Arc::try_unwrap(frame) {
            if self.spare_buffers.len() < self.slots.len() {
                self.spare_buffers.push(frame.into_data());
            }
        }
    }

    fn vacate(&mut self, slot: usize) {
        if let Some(frame) = self.slots[slot].frame.take() {
            self.recycle(frame);
        }
    }
}

/// Fixed-size frame store shared between a producing worker and its
/// consumers ("weak heap").
///
/// Records carry [`ArenaHandle`]s instead of pixels. When every slot is
/// occupied, attaching evicts the oldest frame, so memory stays bounded even
/// if a consumer never releases what it read. Freed pixel buffers are kept
/// and handed back out by [`lease_buffer`](Self::lease_buffer).
///
/// Cloning is cheap and yields another handle to the same arena.
#[derive(Clone)]
pub struct SharedArena {
    inner: Arc<Mutex<ArenaInner>>,
}

impl SharedArena {
    /// `capacity` is raised to [`MIN_ARENA_SLOTS`] so a published record is
    /// never evicted before its consumer reads it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_ARENA_SLOTS);
        let inner = ArenaInner {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            occupied: VecDeque::with_capacity(capacity),
            free: (0..capacity).rev().collect(),
            spare_buffers: Vec::new(),
            evictions: 0,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    // Slot bookkeeping stays consistent across a panicking holder, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, ArenaInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a frame and returns its handle, evicting the oldest frame if
    /// the arena is full.
    pub fn attach(&self, frame: Frame) -> ArenaHandle {
        let mut inner = self.lock();

        let slot = match inner.free.pop() {
            Some(slot) => slot,
            None => {
                let oldest = inner
                    .occupied
                    .pop_front()
                    .expect("a full arena has occupied slots");
                inner.vacate(oldest);
                inner.evictions += 1;
                log::trace!("Arena full, evicted slot {oldest}");
                oldest
            }
        };

        let entry = &mut inner.slots[slot];
        entry.generation = entry.generation.wrapping_add(1);
        entry.frame = Some(Arc::new(frame));
        let generation = entry.generation;
        inner.occupied.push_back(slot);

        ArenaHandle {
            slot: slot as u32,
            generation,
        }
    }

    pub fn resolve(&self, handle: ArenaHandle) -> Option<Arc<Frame>> {
        let inner = self.lock();
        let entry = inner.slots.get(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.frame.clone()
    }

    /// Frees the handle's slot. Returns `false` for stale handles.
    pub fn release(&self, handle: ArenaHandle) -> bool {
        let mut inner = self.lock();
        let slot = handle.slot as usize;
        let live = inner
            .slots
            .get(slot)
            .is_some_and(|e| e.generation == handle.generation && e.frame.is_some());
        if !live {
            return false;
        }

        inner.vacate(slot);
        inner.occupied.retain(|&s| s != slot);
        inner.free.push(slot);
        true
    }

    /// An empty buffer, reusing a released frame's allocation when one is
    /// available.
    pub fn lease_buffer(&self) -> Vec<u8> {
        let mut buffer = self.lock().spare_buffers.pop().unwrap_or_default();
        buffer.clear();
        buffer
    }

    /// Frames currently stored.
    pub fn len(&self) -> usize {
        self.lock().occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    /// Frames dropped to make room since the arena was created.
    pub fn evictions(&self) -> u64 {
        self.lock().evictions
    }
}

impl std::fmt::Debug for SharedArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SharedArena")
            .field("capacity", &inner.slots.len())
            .field("occupied", &inner.occupied.len())
            .field("evictions", &inner.evictions)
            .finish()
    }
}
