//! CLI command implementations

pub mod apply;
pub mod create_lut;
pub mod info;
pub mod preview;
pub mod resize;

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use lutools_core::{Engine, EngineEvent, EventReceiver, LogLevel, LutHandle, LutoolsResult, Operation, PixelBuffer};

use crate::LutArgs;

/// How often the interactive thread drains engine events.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Load image from path
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    PixelBuffer::load(path).with_context(|| format!("Failed to load: {}", path.display()))
}

/// Save image to path
pub fn save_image(engine: &Engine, path: &Path, image: &PixelBuffer) -> Result<()> {
    image
        .save(path, engine.config().jpeg_quality)
        .with_context(|| format!("Failed to save: {}", path.display()))
}

/// Load every LUT of the stack, pairing blends by position.
pub fn load_luts(engine: &Engine, args: &LutArgs) -> Result<Vec<LutHandle>> {
    args.luts
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let blend = args.blends.get(i).copied().unwrap_or(1.0);
            engine
                .load_lut(path, blend)
                .with_context(|| format!("Failed to load LUT: {}", path.display()))
        })
        .collect()
}

/// Run `job` on a worker thread while this thread prints engine events.
///
/// `events` is the receiver `main` subscribed before dispatch, so anything
/// queued by earlier synchronous calls is printed first.
pub fn with_events<T: Send>(
    engine: &Engine,
    events: &mut EventReceiver,
    job: impl FnOnce(&Engine) -> LutoolsResult<T> + Send,
) -> LutoolsResult<T> {
    thread::scope(|scope| {
        let worker = scope.spawn(|| job(engine));
        while !worker.is_finished() {
            print_events(events);
            thread::sleep(POLL_INTERVAL);
        }
        print_events(events);
        worker
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

/// Print every queued event to stderr.
pub fn print_events(events: &mut EventReceiver) {
    for event in events.drain() {
        eprintln!("{}", format_event(&event));
    }
}

fn format_event(event: &EngineEvent) -> String {
    match event {
        EngineEvent::Log { level, message } => {
            let tag = match level {
                LogLevel::Info => "log",
                LogLevel::Warning => "warning",
                LogLevel::Error => "error",
            };
            format!("[{tag}] {message}")
        }
        EngineEvent::Progress { operation, fraction } => {
            let name = match operation {
                Operation::CreateLut => "create-lut",
                Operation::ProcessFiles => "apply",
            };
            format!("[{name}] {:5.1}%", fraction * 100.0)
        }
    }
}
