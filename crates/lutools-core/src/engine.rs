//! Engine façade. Owns loaded LUTs and exposes every operation the
//! presentation layer calls.
//!
//! An [`Engine`] moves through `Uninitialized → Ready → ShutDown` and can be
//! re-initialized after shutdown. All methods take `&self`: the handle table
//! sits behind a `RwLock`, so previews (readers) run alongside loads and
//! unloads (writers). Every failure is recorded as the last error and
//! published as an error [`EngineEvent::Log`](crate::events::EngineEvent).

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::{LutoolsError, LutoolsResult};
use crate::events::{EventBus, EventReceiver, Operation};
use crate::fit;
use crate::image::PixelBuffer;
use crate::pipeline;
use crate::resample;
use crate::transform::evaluate::{LutStage, clamp_blend};
use crate::transform::lut::Lut3D;
use crate::transform::params::AdjustmentParams;

/// Opaque identifier of a loaded LUT. Zero is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LutHandle(NonZeroU32);

impl LutHandle {
    /// Rebuild a handle from its raw value. `0` yields `None`.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for LutHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state reported by [`Engine::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineStatus {
    Uninitialized,
    Ready,
    ShutDown,
}

/// Description of a loaded LUT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LutInfo {
    pub handle: LutHandle,
    pub path: PathBuf,
    pub size: usize,
    pub blend: f32,
}

/// Outcome of [`Engine::process_files`]. Failures do not abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Output paths written successfully.
    pub succeeded: Vec<PathBuf>,
    /// Input paths that failed, with the error message.
    pub failed: Vec<(PathBuf, String)>,
}

struct LoadedLut {
    lut: Arc<Lut3D>,
    blend: f32,
    path: PathBuf,
}

enum State {
    Uninitialized,
    Ready(HashMap<LutHandle, LoadedLut>),
    ShutDown,
}

/// The colour-grading engine.
pub struct Engine {
    config: EngineConfig,
    state: RwLock<State>,
    /// Never reset, so handles from before a shutdown stay invalid.
    next_handle: AtomicU32,
    events: EventBus,
    last_error: Mutex<Option<String>>,
    cancel: CancelToken,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an uninitialized engine. Call [`Engine::init`] before use.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State::Uninitialized),
            next_handle: AtomicU32::new(1),
            events: EventBus::new(),
            last_error: Mutex::new(None),
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Enter `Ready` with an empty handle table. A no-op when already ready.
    pub fn init(&self) {
        let mut state = self.state.write();
        if matches!(*state, State::Ready(_)) {
            drop(state);
            self.events.warn("engine already initialized");
            return;
        }
        *state = State::Ready(HashMap::new());
        drop(state);
        self.events.info("engine initialized");
    }

    /// Release every loaded LUT and enter `ShutDown`. Later operations fail
    /// with `NotInitialized` until [`Engine::init`] is called again.
    pub fn shutdown(&self) {
        let released = match std::mem::replace(&mut *self.state.write(), State::ShutDown) {
            State::Ready(table) => table.len(),
            _ => 0,
        };
        self.events
            .info(format!("engine shut down, released {released} LUT(s)"));
    }

    pub fn status(&self) -> EngineStatus {
        match *self.state.read() {
            State::Uninitialized => EngineStatus::Uninitialized,
            State::Ready(_) => EngineStatus::Ready,
            State::ShutDown => EngineStatus::ShutDown,
        }
    }

    // ── Events, errors, cancellation ─────────────────────────────

    /// Subscribe to log and progress events emitted from now on.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Message of the most recent failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Ask the running long operation to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.events.info("cancellation requested");
    }

    /// Token shared with long operations, for front-ends that cancel from
    /// another thread without holding the engine.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // ── LUT table ────────────────────────────────────────────────

    /// Parse a `.cube` file and register it with `blend` (clamped to `[0, 1]`).
    ///
    /// Loading the same path twice yields two independent handles. No handle
    /// is allocated when parsing fails.
    pub fn load_lut(&self, path: &Path, blend: f32) -> LutoolsResult<LutHandle> {
        self.record(self.load_lut_inner(path, blend))
    }

    fn load_lut_inner(&self, path: &Path, blend: f32) -> LutoolsResult<LutHandle> {
        self.ensure_ready()?;
        let lut = Lut3D::load_cube(path)?;
        let size = lut.size();
        let blend = clamp_blend(blend);

        let handle = {
            let mut state = self.state.write();
            let State::Ready(table) = &mut *state else {
                return Err(LutoolsError::NotInitialized);
            };
            let handle = self.allocate_handle()?;
            table.insert(
                handle,
                LoadedLut {
                    lut: Arc::new(lut),
                    blend,
                    path: path.to_path_buf(),
                },
            );
            handle
        };

        self.events.info(format!(
            "loaded LUT {} (size {size}) as {handle} with blend={blend:.2}",
            path.display()
        ));
        Ok(handle)
    }

    /// Release one LUT. The handle is invalid afterwards.
    pub fn unload_lut(&self, handle: LutHandle) -> LutoolsResult<()> {
        let result = self.with_table_mut(|table| {
            table
                .remove(&handle)
                .map(|_| ())
                .ok_or(LutoolsError::InvalidHandle(handle.get()))
        });
        if result.is_ok() {
            self.events.info(format!("unloaded LUT {handle}"));
        }
        self.record(result)
    }

    /// Release every loaded LUT, returning how many were released.
    pub fn clear_luts(&self) -> LutoolsResult<usize> {
        let result = self.with_table_mut(|table| {
            let count = table.len();
            table.clear();
            Ok(count)
        });
        if let Ok(count) = result {
            self.events.info(format!("cleared {count} LUT(s)"));
        }
        self.record(result)
    }

    /// Change a loaded LUT's blend factor without re-reading the file.
    pub fn set_blend(&self, handle: LutHandle, blend: f32) -> LutoolsResult<()> {
        let blend = clamp_blend(blend);
        let result = self.with_table_mut(|table| {
            let entry = table
                .get_mut(&handle)
                .ok_or(LutoolsError::InvalidHandle(handle.get()))?;
            entry.blend = blend;
            Ok(())
        });
        if result.is_ok() {
            tracing::debug!(%handle, blend, "blend updated");
        }
        self.record(result)
    }

    pub fn lut_info(&self, handle: LutHandle) -> LutoolsResult<LutInfo> {
        let result = self.with_table(|table| {
            table
                .get(&handle)
                .map(|entry| info(handle, entry))
                .ok_or(LutoolsError::InvalidHandle(handle.get()))
        });
        self.record(result)
    }

    /// Every loaded LUT, ordered by handle.
    pub fn loaded_luts(&self) -> LutoolsResult<Vec<LutInfo>> {
        let result = self.with_table(|table| {
            let mut infos: Vec<LutInfo> = table
                .iter()
                .map(|(&handle, entry)| info(handle, entry))
                .collect();
            infos.sort_by_key(|i| i.handle);
            Ok(infos)
        });
        self.record(result)
    }

    // ── Image operations ─────────────────────────────────────────

    /// Scale `src` to fit within `bounds` (the configured preview box when
    /// `None`), then apply the adjustment chain and LUT stages.
    pub fn generate_preview(
        &self,
        src: &PixelBuffer,
        handles: &[LutHandle],
        params: &AdjustmentParams,
        bounds: Option<(u32, u32)>,
    ) -> LutoolsResult<PixelBuffer> {
        let (max_w, max_h) =
            bounds.unwrap_or((self.config.preview_max_width, self.config.preview_max_height));
        let result = self.stages(handles).and_then(|stages| {
            let scaled = resample::fit_within(src, max_w, max_h, self.config.resize_filter)?;
            Ok(pipeline::apply(&scaled, &stages, params))
        });
        self.record(result)
    }

    /// Like [`Engine::generate_preview`] but at exactly `width × height`.
    pub fn generate_preview_exact(
        &self,
        src: &PixelBuffer,
        handles: &[LutHandle],
        params: &AdjustmentParams,
        width: u32,
        height: u32,
    ) -> LutoolsResult<PixelBuffer> {
        let result = self.stages(handles).and_then(|stages| {
            let scaled = resample::resize(src, width, height, self.config.resize_filter)?;
            Ok(pipeline::apply(&scaled, &stages, params))
        });
        self.record(result)
    }

    /// Apply the full pipeline at the source resolution.
    pub fn process_image(
        &self,
        src: &PixelBuffer,
        handles: &[LutHandle],
        params: &AdjustmentParams,
    ) -> LutoolsResult<PixelBuffer> {
        let result = self
            .stages(handles)
            .map(|stages| pipeline::apply(src, &stages, params));
        self.record(result)
    }

    /// Resize to exactly `width × height` with the configured filter.
    pub fn resize(&self, src: &PixelBuffer, width: u32, height: u32) -> LutoolsResult<PixelBuffer> {
        let result = self
            .ensure_ready()
            .and_then(|()| resample::resize(src, width, height, self.config.resize_filter));
        self.record(result)
    }

    /// Load `input`, process it at full resolution, and save to `output`.
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        handles: &[LutHandle],
        params: &AdjustmentParams,
    ) -> LutoolsResult<()> {
        let result = self
            .stages(handles)
            .and_then(|stages| self.process_file_with(input, output, &stages, params));
        if result.is_ok() {
            self.events.info(format!("saved {}", output.display()));
        }
        self.record(result)
    }

    fn process_file_with(
        &self,
        input: &Path,
        output: &Path,
        stages: &[LutStage],
        params: &AdjustmentParams,
    ) -> LutoolsResult<()> {
        let src = PixelBuffer::load(input)?;
        let graded = pipeline::apply(&src, stages, params);
        graded.save(output, self.config.jpeg_quality)
    }

    /// Process `(input, output)` pairs in parallel.
    ///
    /// A failing file is logged and listed in the summary; the rest of the
    /// batch continues. Progress is reported per finished file. A cancel
    /// request, pending or issued mid-batch, skips the files not yet started
    /// and returns `Cancelled`.
    pub fn process_files(
        &self,
        jobs: &[(PathBuf, PathBuf)],
        handles: &[LutHandle],
        params: &AdjustmentParams,
    ) -> LutoolsResult<BatchSummary> {
        let result = self.process_files_inner(jobs, handles, params);
        self.record(result)
    }

    fn process_files_inner(
        &self,
        jobs: &[(PathBuf, PathBuf)],
        handles: &[LutHandle],
        params: &AdjustmentParams,
    ) -> LutoolsResult<BatchSummary> {
        let stages = self.stages(handles)?;
        self.cancel.check()?;
        self.events
            .info(format!("processing {} file(s)", jobs.len()));

        let total = jobs.len();
        let finished = Mutex::new(0_usize);
        let outcomes: Vec<Option<Result<PathBuf, (PathBuf, String)>>> = jobs
            .par_iter()
            .map(|(input, output)| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let outcome = match self.process_file_with(input, output, &stages, params) {
                    Ok(()) => Ok(output.clone()),
                    Err(e) => {
                        self.events
                            .error(format!("failed to process {}: {e}", input.display()));
                        Err((input.clone(), e.to_string()))
                    }
                };
                // Count and report under one lock so fractions never go backwards.
                let mut done = finished.lock();
                *done += 1;
                self.events
                    .progress(Operation::ProcessFiles, *done as f32 / total as f32);
                Some(outcome)
            })
            .collect();

        if outcomes.iter().any(Option::is_none) {
            self.cancel.reset();
            return Err(LutoolsError::Cancelled);
        }

        let mut summary = BatchSummary::default();
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                Ok(output) => summary.succeeded.push(output),
                Err(failure) => summary.failed.push(failure),
            }
        }
        if total == 0 {
            self.events.progress(Operation::ProcessFiles, 1.0);
        }
        // A request that arrived after the last file started is stale.
        self.cancel.reset();
        if let Some((path, message)) = summary.failed.last() {
            *self.last_error.lock() = Some(format!("{}: {message}", path.display()));
        }
        self.events.info(format!(
            "batch finished: {} succeeded, {} failed",
            summary.succeeded.len(),
            summary.failed.len()
        ));
        Ok(summary)
    }

    /// Fit one LUT per entry of `sizes` from a before/after image pair and
    /// write each to `<prefix>_<size>.cube`. Returns the written paths.
    pub fn create_lut_from_images(
        &self,
        before: &Path,
        after: &Path,
        prefix: &Path,
        sizes: &[usize],
    ) -> LutoolsResult<Vec<PathBuf>> {
        let result = self.create_lut_inner(before, after, prefix, sizes);
        self.record(result)
    }

    fn create_lut_inner(
        &self,
        before: &Path,
        after: &Path,
        prefix: &Path,
        sizes: &[usize],
    ) -> LutoolsResult<Vec<PathBuf>> {
        self.ensure_ready()?;
        fit::check_sizes(sizes)?;
        self.cancel.check()?;
        let started = Instant::now();

        let before_img = PixelBuffer::load(before)?;
        let after_img = PixelBuffer::load(after)?;
        self.events.info(format!(
            "fitting {} LUT(s) from {} and {}",
            sizes.len(),
            before.display(),
            after.display()
        ));

        let luts = fit::fit_luts(&before_img, &after_img, sizes, &self.cancel, &mut |fraction| {
            self.events.progress(Operation::CreateLut, fraction)
        })?;

        let mut written = Vec::with_capacity(luts.len());
        for lut in &luts {
            let path = fit::output_path(prefix, lut.size());
            lut.save_cube(&path, &self.config.cube_title)?;
            self.events.info(format!("wrote {}", path.display()));
            written.push(path);
        }

        self.cancel.reset();
        self.events.progress(Operation::CreateLut, 1.0);
        self.events.info(format!(
            "created {} LUT(s) in {:.2}s",
            written.len(),
            started.elapsed().as_secs_f64()
        ));
        Ok(written)
    }

    // ── Internals ────────────────────────────────────────────────

    fn allocate_handle(&self) -> LutoolsResult<LutHandle> {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        // Only reachable after the counter wraps.
        LutHandle::new(raw).ok_or(LutoolsError::InvalidHandle(0))
    }

    fn ensure_ready(&self) -> LutoolsResult<()> {
        self.with_table(|_| Ok(()))
    }

    fn with_table<R>(
        &self,
        f: impl FnOnce(&HashMap<LutHandle, LoadedLut>) -> LutoolsResult<R>,
    ) -> LutoolsResult<R> {
        match &*self.state.read() {
            State::Ready(table) => f(table),
            _ => Err(LutoolsError::NotInitialized),
        }
    }

    fn with_table_mut<R>(
        &self,
        f: impl FnOnce(&mut HashMap<LutHandle, LoadedLut>) -> LutoolsResult<R>,
    ) -> LutoolsResult<R> {
        match &mut *self.state.write() {
            State::Ready(table) => f(table),
            _ => Err(LutoolsError::NotInitialized),
        }
    }

    /// Snapshot the lattices for `handles` so evaluation runs without the lock.
    fn stages(&self, handles: &[LutHandle]) -> LutoolsResult<Vec<LutStage>> {
        self.with_table(|table| {
            handles
                .iter()
                .map(|handle| {
                    table
                        .get(handle)
                        .map(|entry| LutStage::new(Arc::clone(&entry.lut), entry.blend))
                        .ok_or(LutoolsError::InvalidHandle(handle.get()))
                })
                .collect()
        })
    }

    fn record<T>(&self, result: LutoolsResult<T>) -> LutoolsResult<T> {
        if let Err(e) = &result {
            let message = e.to_string();
            *self.last_error.lock() = Some(message.clone());
            self.events.error(message);
        }
        result
    }
}

fn info(handle: LutHandle, entry: &LoadedLut) -> LutInfo {
    LutInfo {
        handle,
        path: entry.path.clone(),
        size: entry.lut.size(),
        blend: entry.blend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::events::{EngineEvent, LogLevel};

    fn write_identity(dir: &Path, name: &str, size: usize) -> PathBuf {
        let path = dir.join(name);
        Lut3D::identity(size).unwrap().save_cube(&path, "id").unwrap();
        path
    }

    fn ready_engine() -> Engine {
        let engine = Engine::default();
        engine.init();
        engine
    }

    #[test]
    fn test_operations_before_init_fail() {
        let engine = Engine::default();
        assert_eq!(engine.status(), EngineStatus::Uninitialized);
        let err = engine.load_lut(Path::new("x.cube"), 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        assert!(engine.last_error().is_some());
    }

    #[test]
    fn test_handles_are_distinct_for_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_identity(dir.path(), "id.cube", 4);
        let engine = ready_engine();
        let a = engine.load_lut(&path, 1.0).unwrap();
        let b = engine.load_lut(&path, 0.5).unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.loaded_luts().unwrap().len(), 2);
        assert_eq!(engine.lut_info(b).unwrap().blend, 0.5);
    }

    #[test]
    fn test_blend_is_clamped_and_updatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_identity(dir.path(), "id.cube", 4);
        let engine = ready_engine();
        let h = engine.load_lut(&path, 7.0).unwrap();
        assert_eq!(engine.lut_info(h).unwrap().blend, 1.0);
        engine.set_blend(h, 0.25).unwrap();
        assert_eq!(engine.lut_info(h).unwrap().blend, 0.25);
    }

    #[test]
    fn test_clear_luts_invalidates_every_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_identity(dir.path(), "id.cube", 4);
        let engine = ready_engine();
        let h = engine.load_lut(&path, 1.0).unwrap();
        engine.load_lut(&path, 1.0).unwrap();
        assert_eq!(engine.clear_luts().unwrap(), 2);
        assert_eq!(engine.lut_info(h).unwrap_err().kind(), ErrorKind::InvalidHandle);
    }

    #[test]
    fn test_handles_not_reused_after_reinit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_identity(dir.path(), "id.cube", 4);
        let engine = ready_engine();
        let old = engine.load_lut(&path, 1.0).unwrap();
        engine.shutdown();
        engine.init();
        let new = engine.load_lut(&path, 1.0).unwrap();
        assert_ne!(old, new);
        assert_eq!(engine.unload_lut(old).unwrap_err().kind(), ErrorKind::InvalidHandle);
    }

    #[test]
    fn test_double_init_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_identity(dir.path(), "id.cube", 4);
        let engine = ready_engine();
        let h = engine.load_lut(&path, 1.0).unwrap();
        let mut events = engine.subscribe();
        engine.init();
        assert!(engine.lut_info(h).is_ok());
        assert!(events.drain().iter().any(|e| matches!(
            e,
            EngineEvent::Log { level: LogLevel::Warning, .. }
        )));
    }

    #[test]
    fn test_failures_emit_error_events() {
        let engine = ready_engine();
        let mut events = engine.subscribe();
        let bogus = LutHandle::new(42).unwrap();
        let src = PixelBuffer::filled(2, 2, [1, 2, 3]).unwrap();
        let err = engine
            .process_image(&src, &[bogus], &AdjustmentParams::default())
            .unwrap_err();
        assert!(matches!(err, LutoolsError::InvalidHandle(42)));
        assert_eq!(engine.last_error().as_deref(), Some("invalid LUT handle: 42"));
        assert!(events.drain().iter().any(|e| matches!(
            e,
            EngineEvent::Log { level: LogLevel::Error, .. }
        )));
    }

    #[test]
    fn test_preview_uses_configured_bounds() {
        let engine = Engine::new(EngineConfig {
            preview_max_width: 32,
            preview_max_height: 32,
            ..EngineConfig::default()
        });
        engine.init();
        let src = PixelBuffer::filled(128, 64, [10, 20, 30]).unwrap();
        let params = AdjustmentParams::default();
        let out = engine.generate_preview(&src, &[], &params, None).unwrap();
        assert_eq!(out.dimensions(), (32, 16));
        let out = engine.generate_preview(&src, &[], &params, Some((256, 256))).unwrap();
        assert_eq!(out.dimensions(), (256, 128));
        let out = engine.generate_preview_exact(&src, &[], &params, 7, 3).unwrap();
        assert_eq!(out.dimensions(), (7, 3));
    }

    #[test]
    fn test_zero_handle_is_unrepresentable() {
        assert!(LutHandle::new(0).is_none());
        assert_eq!(LutHandle::new(3).map(LutHandle::get), Some(3));
    }
}
