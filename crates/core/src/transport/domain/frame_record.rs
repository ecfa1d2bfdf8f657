use serde::{Deserialize, Serialize};

use crate::shared::shared_arena::ArenaHandle;

/// One published frame: metadata plus a handle to the pixels in the shared
/// arena.
///
/// Records are immutable once built; `sequence_id` is assigned by the
/// producing worker and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    sequence_id: u64,
    frame_index: usize,
    frame_count: Option<usize>,
    name: String,
    image: ArenaHandle,
}

impl FrameRecord {
    pub fn new(
        sequence_id: u64,
        frame_index: usize,
        frame_count: Option<usize>,
        name: String,
        image: ArenaHandle,
    ) -> Self {
        Self {
            sequence_id,
            frame_index,
            frame_count,
            name,
            image,
        }
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn frame_count(&self) -> Option<usize> {
        self.frame_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> ArenaHandle {
        self.image
    }
}
