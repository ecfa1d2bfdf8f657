use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::shared::shared_arena::SharedArena;
use crate::transport::domain::output_channel::OutputChannel;
use crate::worker::frame_worker::FrameWorker;
use crate::worker::worker_state::WorkerState;

/// Host-to-worker commands, applied between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerCommand {
    Reconfigure(WorkerState),
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("worker thread panicked")]
    Panicked,
    #[error("worker already joined")]
    Stopped,
}

/// Runs `worker` on its own thread until the returned handle is stopped.
pub fn spawn(
    worker: FrameWorker,
    arena: SharedArena,
    output: Box<dyn OutputChannel>,
) -> WorkerHandle {
    let (commands_tx, commands_rx) = crossbeam_channel::unbounded::<WorkerCommand>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();

    let thread = thread::spawn(move || {
        run_worker(worker, arena, output, &commands_rx, &cancelled_clone)
    });

    WorkerHandle {
        cancelled,
        commands: commands_tx,
        thread: Some(thread),
    }
}

fn run_worker(
    mut worker: FrameWorker,
    arena: SharedArena,
    output: Box<dyn OutputChannel>,
    commands: &Receiver<WorkerCommand>,
    cancelled: &AtomicBool,
) -> FrameWorker {
    worker.on_start(arena, output);

    while !cancelled.load(Ordering::Relaxed) {
        for command in commands.try_iter() {
            match command {
                WorkerCommand::Reconfigure(state) => worker.reconfigure(state),
            }
        }
        worker.on_tick();
    }

    worker.on_stop();
    worker
}

/// Owner-side handle of a hosted worker. Dropping it stops the worker and
/// waits for its thread.
pub struct WorkerHandle {
    cancelled: Arc<AtomicBool>,
    commands: Sender<WorkerCommand>,
    thread: Option<JoinHandle<FrameWorker>>,
}

impl WorkerHandle {
    /// Queues a new configuration; the worker picks it up before its next tick.
    pub fn reconfigure(&self, state: WorkerState) -> Result<(), HostError> {
        self.commands
            .send(WorkerCommand::Reconfigure(state))
            .map_err(|_| {
                log::warn!("Worker has exited, reconfigure dropped");
                HostError::Stopped
            })
    }

    /// Asks the worker to finish after its current tick.
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the worker and hands it back once its thread exits.
    pub fn join(&mut self) -> Result<FrameWorker, HostError> {
        self.stop();
        let thread = self.thread.take().ok_or(HostError::Stopped)?;
        thread.join().map_err(|_| HostError::Panicked)
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Err(e) = self.join() {
                log::error!("Worker shutdown failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use crate::source::domain::frame_source::SourceKind;
    use crate::transport::infrastructure::bounded_channel::{bounded, RecordReceiver};
    use crate::worker::error_slot::ErrorSlot;

    const READ_TIMEOUT: Duration = Duration::from_secs(5);

    fn write_sequence(dir: &Path, count: usize) {
        for i in 0..count {
            let img = image::RgbImage::from_pixel(8, 4, image::Rgb([i as u8 * 10, 0, 0]));
            img.save(dir.join(format!("frame_{i:03}.png"))).unwrap();
        }
    }

    fn start(state: WorkerState, capacity: usize) -> (WorkerHandle, RecordReceiver, SharedArena, ErrorSlot) {
        let errors = ErrorSlot::new();
        let arena = SharedArena::new(4);
        let (tx, rx) = bounded(capacity);
        let worker = FrameWorker::new(state, Arc::new(errors.clone()));
        let handle = spawn(worker, arena.clone(), Box::new(tx));
        (handle, rx, arena, errors)
    }

    #[test]
    fn test_streams_image_sequence_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_sequence(dir.path(), 4);

        let (mut handle, rx, arena, errors) =
            start(WorkerState::new(SourceKind::ImageSequence, dir.path()), 2);

        let mut ids = Vec::new();
        for _ in 0..4 {
            let record = rx.read_timeout(READ_TIMEOUT).unwrap();
            let frame = arena.resolve(record.image()).unwrap();
            assert_eq!(frame.shape(), (4, 8, 3));
            assert_eq!(frame.data()[0], record.frame_index() as u8 * 10);
            assert!(arena.release(record.image()));
            ids.push(record.sequence_id());
        }

        let worker = handle.join().unwrap();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(!worker.has_source());
        assert_eq!(errors.current(), None);
    }

    #[test]
    fn test_never_more_than_one_unread_record() {
        let dir = tempfile::tempdir().unwrap();
        write_sequence(dir.path(), 3);

        let (mut handle, rx, _arena, _errors) =
            start(WorkerState::new(SourceKind::ImageSequence, dir.path()), 4);

        thread::sleep(Duration::from_millis(200));
        assert_eq!(rx.unread(), 1);

        let worker = handle.join().unwrap();
        assert!(!worker.has_pending());
    }

    #[test]
    fn test_missing_input_reports_error_and_idles() {
        let (mut handle, rx, _arena, errors) =
            start(WorkerState::new(SourceKind::ImageSequence, "/nonexistent/frames"), 2);

        thread::sleep(Duration::from_millis(50));
        assert!(errors.current().unwrap().contains("/nonexistent/frames"));
        assert!(rx.try_read().is_none());
        assert!(!handle.is_finished());

        let worker = handle.join().unwrap();
        assert!(!worker.has_source());
    }

    #[test]
    fn test_reconfigure_switches_input_while_running() {
        let dir = tempfile::tempdir().unwrap();
        write_sequence(dir.path(), 2);

        let (mut handle, rx, _arena, _errors) = start(WorkerState::default(), 2);
        thread::sleep(Duration::from_millis(20));
        assert!(rx.try_read().is_none());

        handle
            .reconfigure(WorkerState::new(SourceKind::ImageSequence, dir.path()))
            .unwrap();
        let record = rx.read_timeout(READ_TIMEOUT).unwrap();
        assert_eq!(record.sequence_id(), 1);
        assert_eq!(record.name(), "frame_000.png");

        let worker = handle.join().unwrap();
        assert_eq!(worker.state().kind(), SourceKind::ImageSequence);
    }

    #[test]
    fn test_join_twice_reports_stopped() {
        let (mut handle, _rx, _arena, _errors) = start(WorkerState::default(), 1);
        handle.join().unwrap();
        assert!(handle.is_finished());
        assert!(matches!(handle.join(), Err(HostError::Stopped)));
    }

    #[test]
    fn test_reconfigure_after_exit_is_rejected() {
        let (mut handle, _rx, _arena, _errors) = start(WorkerState::default(), 1);
        handle.join().unwrap();

        let result = handle.reconfigure(WorkerState::new(SourceKind::VideoFile, "/clip.mp4"));
        assert!(matches!(result, Err(HostError::Stopped)));
    }

    #[test]
    fn test_drop_stops_worker() {
        let (handle, rx, _arena, _errors) = start(WorkerState::default(), 1);
        drop(handle);
        // The worker owned the only sender
        assert!(rx.read().is_none());
    }
}
