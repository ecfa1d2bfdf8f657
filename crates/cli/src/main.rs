mod settings;

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;

use framefeed_core::export::domain::frame_exporter::FrameExporter;
use framefeed_core::export::infrastructure::image_file_exporter::ImageFileExporter;
use framefeed_core::shared::constants::{
    DEFAULT_ARENA_SLOTS, DEFAULT_CHANNEL_CAPACITY, MIN_ARENA_SLOTS,
};
use framefeed_core::shared::shared_arena::SharedArena;
use framefeed_core::source::domain::frame_source::SourceKind;
use framefeed_core::transport::domain::frame_record::FrameRecord;
use framefeed_core::transport::infrastructure::bounded_channel::bounded;
use framefeed_core::worker::error_slot::ErrorSlot;
use framefeed_core::worker::frame_worker::FrameWorker;
use framefeed_core::worker::infrastructure::threaded_worker_host;
use framefeed_core::worker::worker_logger::StdoutWorkerLogger;
use framefeed_core::worker::worker_state::WorkerState;

/// Stream frames from a video file or an image directory, one at a time.
#[derive(Parser)]
#[command(name = "framefeed")]
struct Cli {
    /// Input video file or image directory (overrides the config file).
    input: Option<PathBuf>,

    /// Input kind: video or images. Guessed from the input when omitted.
    #[arg(long)]
    kind: Option<String>,

    /// Resize frames to this width, keeping aspect ratio.
    #[arg(long)]
    target_width: Option<u32>,

    /// Unread records the channel can hold.
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    capacity: usize,

    /// Frames the shared arena keeps before evicting the oldest.
    #[arg(long, default_value_t = DEFAULT_ARENA_SLOTS)]
    arena_slots: usize,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Write every received frame as a PNG into this directory.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Worker state JSON file (default: platform config dir, framefeed/state.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop once no frame has arrived for this many milliseconds.
    #[arg(long, default_value = "2000")]
    idle_timeout_ms: u64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let state = resolve_state(&cli)?;
    let Some(input) = state.input_path.clone() else {
        return Err("No input given and none configured".into());
    };
    log::info!("Streaming {} ({})", input.display(), state.kind());

    let errors = ErrorSlot::new();
    let arena = SharedArena::new(cli.arena_slots);
    let (tx, rx) = bounded(cli.capacity);
    let worker = FrameWorker::new(state, Arc::new(errors.clone()))
        .with_logger(Box::new(StdoutWorkerLogger::default()));
    let mut handle = threaded_worker_host::spawn(worker, arena.clone(), Box::new(tx));

    let exporter = ImageFileExporter::new();
    let idle_timeout = Duration::from_millis(cli.idle_timeout_ms);
    let started = Instant::now();
    let mut received = 0usize;
    let mut last_error = None;

    while cli.max_frames.map_or(true, |max| received < max) {
        let record = match rx.read_timeout(idle_timeout) {
            Ok(record) => record,
            Err(RecvTimeoutError::Timeout) => {
                log::info!("No frame for {}ms, stopping", cli.idle_timeout_ms);
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let dump = cli
            .dump_dir
            .as_deref()
            .map(|dir| (dir, &exporter as &dyn FrameExporter));
        consume(&arena, &record, dump)?;
        received += 1;

        if let Some(message) = errors.take() {
            eprintln!("Warning: {message}");
            last_error = Some(message);
        }
    }

    handle.join()?;
    if let Some(message) = errors.take() {
        eprintln!("Warning: {message}");
        last_error = Some(message);
    }

    let elapsed = started.elapsed().as_secs_f64();
    eprintln!(
        "Received {received} frames in {elapsed:.1}s ({} evicted before release)",
        arena.evictions()
    );

    match last_error {
        Some(message) if received == 0 => Err(message.into()),
        _ => Ok(()),
    }
}

fn consume(
    arena: &SharedArena,
    record: &FrameRecord,
    dump: Option<(&Path, &dyn FrameExporter)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(frame) = arena.resolve(record.image()) else {
        log::warn!(
            "Frame {} was evicted before it could be read",
            record.sequence_id()
        );
        return Ok(());
    };

    let position = match record.frame_count() {
        Some(total) => format!("{}/{total}", record.frame_index() + 1),
        None => format!("{}", record.frame_index() + 1),
    };
    log::debug!(
        "#{} frame {position} '{}' {}x{}x{}",
        record.sequence_id(),
        record.name(),
        frame.width(),
        frame.height(),
        frame.channels()
    );

    if let Some((dir, exporter)) = dump {
        let path = dir.join(format!("frame_{:06}.png", record.sequence_id()));
        exporter.export(&path, &frame)?;
    }

    drop(frame);
    arena.release(record.image());
    Ok(())
}

/// Config file first, then command-line overrides.
fn resolve_state(cli: &Cli) -> Result<WorkerState, Box<dyn std::error::Error>> {
    let mut state = match &cli.config {
        Some(path) => settings::load_from(path)?,
        None => settings::load(),
    };

    if let Some(input) = &cli.input {
        state.input_path = Some(input.clone());
        state.input_kind = None;
    }
    if let Some(kind) = &cli.kind {
        state.input_kind = Some(parse_kind(kind));
    }
    if state.input_kind.is_none() {
        state.input_kind = state.input_path.as_deref().map(guess_kind);
    }
    if let Some(width) = cli.target_width {
        state.target_width = NonZeroU32::new(width);
    }
    Ok(state)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
    }
    if let Some(kind) = &cli.kind {
        if kind != "video" && kind != "images" {
            return Err(format!("Kind must be 'video' or 'images', got '{kind}'").into());
        }
    }
    if cli.target_width == Some(0) {
        return Err("Target width must be positive".into());
    }
    if cli.capacity == 0 {
        return Err("Capacity must be at least 1".into());
    }
    if cli.arena_slots < MIN_ARENA_SLOTS {
        return Err(format!(
            "Arena slots must be at least {MIN_ARENA_SLOTS}, got {}",
            cli.arena_slots
        )
        .into());
    }
    if cli.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    Ok(())
}

fn parse_kind(kind: &str) -> SourceKind {
    match kind {
        "images" => SourceKind::ImageSequence,
        _ => SourceKind::VideoFile,
    }
}

fn guess_kind(path: &Path) -> SourceKind {
    if path.is_dir() {
        SourceKind::ImageSequence
    } else {
        SourceKind::VideoFile
    }
}
