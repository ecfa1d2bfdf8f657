use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::shared::constants::{PENDING_WATERMARK, TICK_QUANTUM};
use crate::shared::shared_arena::SharedArena;
use crate::source::domain::frame_source::{FrameSource, SeekOrigin, SourceFrame};
use crate::source::infrastructure::source_factory::{DefaultSourceFactory, SourceFactory};
use crate::transport::domain::frame_record::FrameRecord;
use crate::transport::domain::output_channel::{ChannelError, OutputChannel};
use crate::worker::error_slot::ErrorReporter;
use crate::worker::worker_logger::{NullWorkerLogger, WorkerLogger};
use crate::worker::worker_state::WorkerState;

/// Drives one frame source and relays its frames downstream, one at a time.
///
/// The worker is a tick-driven state machine: a host calls [`on_start`] once,
/// [`on_tick`] repeatedly, and [`on_stop`] once. Each tick:
///
/// 1. polls the source, but only when no record is pending;
/// 2. writes the pending record, but only when the channel holds no unread
///    record;
/// 3. sleeps for the tick quantum.
///
/// So at most one decoded frame is ever in flight, and decoding never runs
/// ahead of the consumer. Failures go to the error reporter and never
/// escape a tick.
///
/// [`on_start`]: Self::on_start
/// [`on_tick`]: Self::on_tick
/// [`on_stop`]: Self::on_stop
pub struct FrameWorker {
    state: WorkerState,
    factory: Box<dyn SourceFactory>,
    errors: Arc<dyn ErrorReporter>,
    logger: Box<dyn WorkerLogger>,
    tick_quantum: Duration,
    arena: Option<SharedArena>,
    output: Option<Box<dyn OutputChannel>>,
    source: Option<Box<dyn FrameSource>>,
    pending: Option<FrameRecord>,
    /// Ticks the current pending record has waited for room.
    held_ticks: u32,
    last_sequence_id: u64,
    output_disconnected: bool,
}

impl FrameWorker {
    pub fn new(state: WorkerState, errors: Arc<dyn ErrorReporter>) -> Self {
        Self {
            state,
            factory: Box::new(DefaultSourceFactory),
            errors,
            logger: Box::new(NullWorkerLogger),
            tick_quantum: TICK_QUANTUM,
            arena: None,
            output: None,
            source: None,
            pending: None,
            held_ticks: 0,
            last_sequence_id: 0,
            output_disconnected: false,
        }
    }

    pub fn with_factory(mut self, factory: Box<dyn SourceFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn WorkerLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_tick_quantum(mut self, quantum: Duration) -> Self {
        self.tick_quantum = quantum;
        self
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn pending(&self) -> Option<&FrameRecord> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Zero until the first record is built.
    pub fn last_sequence_id(&self) -> u64 {
        self.last_sequence_id
    }

    pub fn on_start(&mut self, arena: SharedArena, output: Box<dyn OutputChannel>) {
        self.arena = Some(arena);
        self.output = Some(output);
        self.output_disconnected = false;
        self.state.input_kind = Some(self.state.kind());
        self.initialize_source();
    }

    /// Swaps in a new configuration: releases the current source, drops any
    /// pending record and opens the new input. Sequence ids keep counting.
    pub fn reconfigure(&mut self, state: WorkerState) {
        self.discard_pending();
        self.set_source(None);
        self.state = state;
        self.state.input_kind = Some(self.state.kind());
        self.initialize_source();
    }

    fn initialize_source(&mut self) {
        let Some(path) = self.state.input_path.clone() else {
            log::info!("No input path configured, worker idle");
            return;
        };
        let kind = self.state.kind();

        match self.factory.open(kind, &path) {
            Ok(mut source) => {
                if let Some(width) = self.state.target_width {
                    source.set_target_width(Some(width));
                }
                source.request_seek(0, SeekOrigin::Start);
                self.logger
                    .info(&format!("Opened {kind} {}", path.display()));
                self.set_source(Some(source));
            }
            Err(e) => self.errors.set_error(&e.to_string()),
        }
    }

    /// Installs `source`, disposing the previous one first.
    pub fn set_source(&mut self, source: Option<Box<dyn FrameSource>>) {
        if self.source.is_none() && source.is_none() {
            return;
        }
        if let Some(mut previous) = self.source.take() {
            previous.dispose();
        }
        self.source = source;
    }

    /// One cooperative step followed by the tick sleep.
    pub fn on_tick(&mut self) {
        self.poll_source();
        self.publish_pending();
        thread::sleep(self.tick_quantum);
    }

    fn poll_source(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let Some(source) = self.source.as_mut() else {
            return;
        };

        let started = Instant::now();
        let result = source.process();

        if let Some(message) = result.new_error {
            self.errors.set_error(&message);
        }
        if let Some(frame) = result.new_frame {
            self.logger
                .timing("decode", started.elapsed().as_secs_f64() * 1000.0);
            self.pending = self.build_record(frame);
            self.held_ticks = 0;
        }
    }

    fn build_record(&mut self, frame: SourceFrame) -> Option<FrameRecord> {
        let arena = self.arena.as_ref()?;
        let started = Instant::now();

        let pixels = match frame.image.into_frame(arena.lease_buffer()) {
            Ok(pixels) => pixels,
            Err(e) => {
                self.errors
                    .set_error(&format!("{}: cannot normalize frame: {e}", frame.name));
                return None;
            }
        };

        self.last_sequence_id += 1;
        let image = arena.attach(pixels);
        self.logger
            .timing("normalize", started.elapsed().as_secs_f64() * 1000.0);

        Some(FrameRecord::new(
            self.last_sequence_id,
            frame.frame_index,
            frame.frame_count,
            frame.name,
            image,
        ))
    }

    fn publish_pending(&mut self) {
        if self.pending.is_none() {
            return;
        }
        let Some(output) = self.output.as_deref() else {
            return;
        };
        if output.has_unread_at_least(PENDING_WATERMARK) {
            self.held_ticks = self.held_ticks.saturating_add(1);
            return;
        }
        let Some(record) = self.pending.take() else {
            return;
        };

        let sequence_id = record.sequence_id();
        let frame_index = record.frame_index();
        let frame_count = record.frame_count();

        match output.write(record) {
            Ok(()) => {
                log::debug!("Published record {sequence_id} (frame {frame_index})");
                self.logger.progress(frame_index + 1, frame_count);
                if self.held_ticks > 0 {
                    self.logger.metric("held_ticks", self.held_ticks as f64);
                }
                self.held_ticks = 0;
                self.output_disconnected = false;
            }
            Err(e) => {
                let disconnected = matches!(e, ChannelError::Disconnected(_));
                if !(disconnected && self.output_disconnected) {
                    self.errors.set_error(&e.to_string());
                }
                self.output_disconnected = disconnected;
                self.pending = Some(e.into_record());
            }
        }
    }

    fn discard_pending(&mut self) {
        if let Some(record) = self.pending.take() {
            log::debug!("Dropping unsent record {}", record.sequence_id());
            if let Some(arena) = &self.arena {
                arena.release(record.image());
            }
        }
    }

    /// Releases the source. An unsent record is dropped, not published.
    pub fn on_stop(&mut self) {
        self.discard_pending();
        self.set_source(None);
        self.logger.summary();
    }
}
