//! Thread boundary between channel sources and the plot.
//!
//! Channel callbacks may fire on any thread, but all plot state lives on the
//! UI thread. Producers push [`ChannelUpdate`]s through a bounded channel and
//! the UI thread drains them into the plot once per loop iteration. Values
//! are stamped when the producer sends them, so a batch drained together
//! keeps its arrival spacing.

use crate::error::{PlotError, Result};
use crate::plot::TimePlot;
use crate::types::{now_secs, ChannelValue, SeriesId};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Updates queued per bridge before producers see back-pressure.
/// 10,000 updates ≈ 10s of a 1kHz channel.
pub const UPDATE_CHANNEL_CAPACITY: usize = 10_000;

/// Something a channel reported about its series
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A new value arrived at `time` (epoch seconds).
    Value { value: ChannelValue, time: f64 },
    /// Connection state changed.
    Connection(bool),
    /// Raw alarm severity code.
    Severity(i64),
    /// Write permission changed. The plot does not use it.
    WriteAccess(bool),
}

/// A [`ChannelEvent`] addressed to one series
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelUpdate {
    pub series: SeriesId,
    pub event: ChannelEvent,
}

impl ChannelUpdate {
    /// A value stamped with the current wall clock
    pub fn value(series: SeriesId, value: impl Into<ChannelValue>) -> Self {
        Self::value_at(series, value, now_secs())
    }

    pub fn value_at(series: SeriesId, value: impl Into<ChannelValue>, time: f64) -> Self {
        Self {
            series,
            event: ChannelEvent::Value {
                value: value.into(),
                time,
            },
        }
    }

    pub fn connection(series: SeriesId, connected: bool) -> Self {
        Self {
            series,
            event: ChannelEvent::Connection(connected),
        }
    }

    pub fn severity(series: SeriesId, code: i64) -> Self {
        Self {
            series,
            event: ChannelEvent::Severity(code),
        }
    }
}

/// Producer-side handle. Clone one per source thread.
#[derive(Debug, Clone)]
pub struct ChannelSender {
    tx: Sender<ChannelUpdate>,
}

impl ChannelSender {
    /// Send an update, blocking while the queue is full
    pub fn send(&self, update: ChannelUpdate) -> Result<()> {
        self.tx
            .send(update)
            .map_err(|_| PlotError::Channel("plot side of the bridge is gone".to_string()))
    }

    /// Send an update without blocking
    ///
    /// A full queue is reported as an error and the update is dropped.
    pub fn try_send(&self, update: ChannelUpdate) -> Result<()> {
        self.tx.try_send(update).map_err(|e| match e {
            TrySendError::Full(u) => {
                PlotError::Channel(format!("update queue full, dropped update for {}", u.series))
            }
            TrySendError::Disconnected(_) => {
                PlotError::Channel("plot side of the bridge is gone".to_string())
            }
        })
    }

    pub fn on_value(&self, series: SeriesId, value: impl Into<ChannelValue>) -> Result<()> {
        self.try_send(ChannelUpdate::value(series, value))
    }

    pub fn on_connection(&self, series: SeriesId, connected: bool) -> Result<()> {
        self.try_send(ChannelUpdate::connection(series, connected))
    }

    pub fn on_severity(&self, series: SeriesId, code: i64) -> Result<()> {
        self.try_send(ChannelUpdate::severity(series, code))
    }

    pub fn on_write_access(&self, series: SeriesId, allowed: bool) -> Result<()> {
        self.try_send(ChannelUpdate {
            series,
            event: ChannelEvent::WriteAccess(allowed),
        })
    }
}

/// UI-side end of the bridge
#[derive(Debug)]
pub struct ChannelBridge {
    rx: Receiver<ChannelUpdate>,
    tx: Sender<ChannelUpdate>,
}

impl Default for ChannelBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelBridge {
    pub fn new() -> Self {
        Self::with_capacity(UPDATE_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { rx, tx }
    }

    /// A new producer handle
    pub fn sender(&self) -> ChannelSender {
        ChannelSender {
            tx: self.tx.clone(),
        }
    }

    /// Drain all pending updates.
    pub fn drain(&self) -> Vec<ChannelUpdate> {
        self.rx.try_iter().collect()
    }

    /// Try to receive a single update without blocking.
    pub fn try_recv(&self) -> Option<ChannelUpdate> {
        self.rx.try_recv().ok()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Apply the updates pending at entry to `plot`
    ///
    /// Updates sent while draining wait for the next call, so a busy
    /// producer cannot hold the UI thread here. Returns the number of
    /// updates applied.
    pub fn drain_into(&self, plot: &mut TimePlot) -> usize {
        let batch = self.rx.len();
        let mut applied = 0;
        for update in self.rx.try_iter().take(batch) {
            plot.apply(update);
            applied += 1;
        }
        if applied > 0 {
            tracing::trace!("Applied {} channel updates", applied);
        }
        applied
    }
}
