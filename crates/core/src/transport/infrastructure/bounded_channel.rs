use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, TrySendError};

use crate::transport::domain::frame_record::FrameRecord;
use crate::transport::domain::output_channel::{ChannelError, OutputChannel};

/// Creates a record channel holding at most `capacity` unread records
/// (at least one).
pub fn bounded(capacity: usize) -> (RecordSender, RecordReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (RecordSender { tx }, RecordReceiver { rx })
}

/// Worker end of the record channel.
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: crossbeam_channel::Sender<FrameRecord>,
}

impl RecordSender {
    pub fn unread(&self) -> usize {
        self.tx.len()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.tx.capacity()
    }
}

impl OutputChannel for RecordSender {
    fn has_unread_at_least(&self, n: usize) -> bool {
        self.tx.len() >= n
    }

    fn write(&self, record: FrameRecord) -> Result<(), ChannelError> {
        self.tx.try_send(record).map_err(|e| match e {
            TrySendError::Full(record) => ChannelError::Full(record),
            TrySendError::Disconnected(record) => ChannelError::Disconnected(record),
        })
    }
}

/// Consumer end of the record channel.
#[derive(Debug, Clone)]
pub struct RecordReceiver {
    rx: crossbeam_channel::Receiver<FrameRecord>,
}

impl RecordReceiver {
    /// Blocks for the next record; `None` once every sender is gone and the
    /// queue is drained.
    pub fn read(&self) -> Option<FrameRecord> {
        self.rx.recv().ok()
    }

    pub fn read_timeout(&self, timeout: Duration) -> Result<FrameRecord, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_read(&self) -> Option<FrameRecord> {
        self.rx.try_recv().ok()
    }

    pub fn unread(&self) -> usize {
        self.rx.len()
    }
}
