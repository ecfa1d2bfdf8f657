use crate::source::domain::frame_source::SeekOrigin;

/// Frame-position bookkeeping shared by the concrete sources.
///
/// Tracks the index of the next frame to deliver and resolves seek requests
/// against it. Seeks are clamped to the known frame range.
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    next_index: usize,
    last_delivered: Option<usize>,
    frame_count: Option<usize>,
    pending_seek: Option<usize>,
}

impl PlaybackCursor {
    pub fn new(frame_count: Option<usize>) -> Self {
        Self {
            next_index: 0,
            last_delivered: None,
            frame_count,
            pending_seek: None,
        }
    }

    pub fn frame_count(&self) -> Option<usize> {
        self.frame_count
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Resolves and records a seek. Returns the target index, or `None` when
    /// the request can't be resolved (an `End` seek with unknown length).
    pub fn request_seek(&mut self, offset: i64, origin: SeekOrigin) -> Option<usize> {
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => self.last_delivered.unwrap_or(0) as i64,
            SeekOrigin::End => self.frame_count?.checked_sub(1)? as i64,
        };
        let mut target = base.saturating_add(offset).max(0) as usize;
        if let Some(count) = self.frame_count {
            target = target.min(count.saturating_sub(1));
        }
        self.pending_seek = Some(target);
        Some(target)
    }

    /// Takes the pending seek target and moves the cursor there.
    pub fn take_seek(&mut self) -> Option<usize> {
        let target = self.pending_seek.take()?;
        self.next_index = target;
        Some(target)
    }

    pub fn has_pending_seek(&self) -> bool {
        self.pending_seek.is_some()
    }

    /// Marks the frame at `next_index` as delivered and returns its index.
    pub fn advance(&mut self) -> usize {
        let index = self.next_index;
        self.last_delivered = Some(index);
        self.next_index += 1;
        index
    }

    /// Records the real length once a stream of unknown length runs out.
    /// Records that the source ran out after `length` frames. A known
    /// frame count is kept.
    pub fn mark_end(&mut self, length: usize) {
        if self.frame_count.is_none() {
            self.frame_count = Some(length);
        }
        self.next_index = self.next_index.min(length);
    }

    pub fn is_exhausted(&self) -> bool {
        !self.has_pending_seek()
            && self
                .frame_count
                .is_some_and(|count| self.next_index >= count)
    }
}
