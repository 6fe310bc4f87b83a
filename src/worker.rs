//! Background frame processing
//!
//! Large line series can be expensive to hand to a renderer at full
//! resolution. When offloading is enabled, a redraw pass snapshots every
//! series into owned [`SeriesFrame`]s and a [`FrameWorker`] thread decimates
//! them. The worker never touches plot state: it gets owned data in and
//! sends owned data back over a one-shot channel that the UI thread polls.
//!
//! At most one job is ever outstanding. A submit while the previous job is
//! still running is rejected and logged instead of queued, so a slow
//! renderer cannot pile up workers.

use crate::error::{PlotError, Result};
use crate::scheduler::SeriesFrame;
use crate::types::PlotStyle;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Maximum number of points to hand the renderer per line series
pub const DEFAULT_MAX_RENDER_POINTS: usize = 2000;

/// Min/max decimation of a time series to roughly `max_points` points
///
/// The first and last samples are always kept. The interior is split into
/// buckets and each bucket contributes its minimum and maximum in time order,
/// so spikes survive decimation.
pub fn decimate(x: &[f64], y: &[f64], max_points: usize) -> (Vec<f64>, Vec<f64>) {
    let len = x.len().min(y.len());
    if len <= max_points || max_points == 0 {
        return (x[..len].to_vec(), y[..len].to_vec());
    }

    let bucket_size = len / (max_points / 2).max(1);
    let mut out_x = Vec::with_capacity(max_points + 2);
    let mut out_y = Vec::with_capacity(max_points + 2);

    out_x.push(x[0]);
    out_y.push(y[0]);

    let interior = 1..len - 1;
    for start in interior.clone().step_by(bucket_size) {
        let end = (start + bucket_size).min(interior.end);
        let (mut min_i, mut max_i) = (start, start);
        for i in start..end {
            if y[i] < y[min_i] {
                min_i = i;
            }
            if y[i] > y[max_i] {
                max_i = i;
            }
        }
        let (first, second) = if min_i <= max_i { (min_i, max_i) } else { (max_i, min_i) };
        out_x.push(x[first]);
        out_y.push(y[first]);
        if second != first {
            out_x.push(x[second]);
            out_y.push(y[second]);
        }
    }

    out_x.push(x[len - 1]);
    out_y.push(y[len - 1]);

    (out_x, out_y)
}

/// Decimate the line frames of a pass; bar frames pass through untouched
pub fn process_frames(frames: Vec<SeriesFrame>, max_points: usize) -> Vec<SeriesFrame> {
    frames
        .into_iter()
        .map(|frame| match frame.style {
            PlotStyle::Line if frame.x.len() > max_points && max_points > 0 => {
                let (x, y) = decimate(&frame.x, &frame.y, max_points);
                SeriesFrame { x, y, ..frame }
            }
            _ => frame,
        })
        .collect()
}

/// Work done on the frames of one pass, given the per-series point budget
pub type FrameProcessor = Arc<dyn Fn(Vec<SeriesFrame>, usize) -> Vec<SeriesFrame> + Send + Sync>;

/// Single-slot background processor for redraw frames
pub struct FrameWorker {
    processor: FrameProcessor,
    in_flight: Option<Receiver<Vec<SeriesFrame>>>,
    handle: Option<JoinHandle<()>>,
    skipped: u64,
    completed: u64,
}

impl Default for FrameWorker {
    fn default() -> Self {
        Self::with_processor(process_frames)
    }
}

impl fmt::Debug for FrameWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWorker")
            .field("busy", &self.is_busy())
            .field("skipped", &self.skipped)
            .field("completed", &self.completed)
            .finish()
    }
}

impl FrameWorker {
    /// A worker that decimates line frames with [`process_frames`]
    pub fn new() -> Self {
        Self::default()
    }

    /// A worker that runs `processor` on each submitted pass
    pub fn with_processor<F>(processor: F) -> Self
    where
        F: Fn(Vec<SeriesFrame>, usize) -> Vec<SeriesFrame> + Send + Sync + 'static,
    {
        Self {
            processor: Arc::new(processor),
            in_flight: None,
            handle: None,
            skipped: 0,
            completed: 0,
        }
    }

    /// Whether a job has been submitted and its result not yet collected
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of submits rejected because a job was still in flight
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Number of results collected
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Start processing `frames` on a background thread
    ///
    /// Returns false, without queuing, when a job is already in flight or
    /// the thread cannot be spawned.
    pub fn submit(&mut self, frames: Vec<SeriesFrame>, max_points: usize) -> bool {
        self.submit_with(|| frames, max_points)
    }

    /// Like [`submit`](Self::submit), but only captures frames once the
    /// slot is known to be free
    pub fn submit_with<F>(&mut self, capture: F, max_points: usize) -> bool
    where
        F: FnOnce() -> Vec<SeriesFrame>,
    {
        if self.is_busy() {
            self.skipped += 1;
            tracing::warn!("Frame processing has taken longer than the redraw period");
            return false;
        }

        let frames = capture();
        let processor = Arc::clone(&self.processor);
        let (tx, rx) = bounded(1);
        let spawned = std::thread::Builder::new()
            .name("pvtrend-frames".to_string())
            .spawn(move || {
                let processed = processor(frames, max_points);
                // The plot may have been dropped; nothing to do then.
                let _ = tx.send(processed);
            });

        match spawned {
            Ok(handle) => {
                tracing::debug!("Frame worker launched");
                self.in_flight = Some(rx);
                self.handle = Some(handle);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to spawn frame worker: {}", e);
                false
            }
        }
    }

    /// Collect a finished result without blocking
    pub fn poll(&mut self) -> Option<Result<Vec<SeriesFrame>>> {
        let outcome = match self.in_flight.as_ref()?.try_recv() {
            Ok(frames) => Ok(frames),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(PlotError::Worker(
                "frame worker exited without a result".to_string(),
            )),
        };
        Some(self.finish(outcome))
    }

    /// Block up to `timeout` for the in-flight result
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<Vec<SeriesFrame>>> {
        let outcome = match self.in_flight.as_ref()?.recv_timeout(timeout) {
            Ok(frames) => Ok(frames),
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => Err(PlotError::Worker(
                "frame worker exited without a result".to_string(),
            )),
        };
        Some(self.finish(outcome))
    }

    fn finish(&mut self, outcome: Result<Vec<SeriesFrame>>) -> Result<Vec<SeriesFrame>> {
        self.in_flight = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Frame worker panicked");
            }
        }
        if outcome.is_ok() {
            self.completed += 1;
        }
        outcome
    }
}
