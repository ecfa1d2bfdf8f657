use std::time::Duration;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Sleep at the end of every worker tick.
pub const TICK_QUANTUM: Duration = Duration::from_millis(1);

/// The worker holds its record while the channel has this many unread items.
pub const PENDING_WATERMARK: usize = 1;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 2;

/// Slots in the shared arena before the oldest frame is evicted.
pub const DEFAULT_ARENA_SLOTS: usize = 8;

/// Frames that can be live at once: the worker's pending record, the unread
/// records the watermark allows, and the one a consumer is still reading.
pub const MIN_ARENA_SLOTS: usize = PENDING_WATERMARK + 2;
