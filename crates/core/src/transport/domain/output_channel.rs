use thiserror::Error;

use crate::transport::domain::frame_record::FrameRecord;

/// A rejected write. The record is handed back so the caller keeps it.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChannelError {
    #[error("output channel is full")]
    Full(FrameRecord),
    #[error("output channel has no reader")]
    Disconnected(FrameRecord),
}

impl ChannelError {
    pub fn into_record(self) -> FrameRecord {
        match self {
            ChannelError::Full(record) | ChannelError::Disconnected(record) => record,
        }
    }
}

/// Producer side of a capacity-limited record queue.
///
/// Used by a single producer. Callers check `has_unread_at_least` before
/// writing; `write` never blocks.
pub trait OutputChannel: Send {
    /// Whether at least `n` written records are still unread. No side effects.
    fn has_unread_at_least(&self, n: usize) -> bool;

    fn write(&self, record: FrameRecord) -> Result<(), ChannelError>;
}
