//! Per-series state: the sample buffer plus channel metadata
//!
//! A [`SeriesState`] is created when a series is attached to a plot and is
//! mutated only from the UI thread, by channel callbacks and by scheduler
//! ticks. Which of those two paths appends to the buffer is decided by the
//! series' [`UpdateMode`]:
//!
//! - `OnArrival`: every value is appended as it arrives
//! - `FixedRate`: arrivals only replace a pending value, and each scheduler
//!   tick appends the pending value (if any) stamped with the tick time
//!
//! Values arriving faster than the tick rate in `FixedRate` mode are
//! overwritten; only the latest survives to the next tick.

use crate::buffer::{SampleBuffer, DEFAULT_CAPACITY};
use crate::types::{
    generate_color, remove_protocol, AppMode, ChannelValue, PlotStyle, SeriesId, Severity,
    UpdateMode,
};
use serde::{Deserialize, Serialize};

/// Something that tracks a channel's connection state
pub trait ConnectionAware {
    fn connection_changed(&mut self, connected: bool);
    fn is_connected(&self) -> bool;
}

/// Something that tracks a channel's alarm severity
pub trait AlarmAware {
    /// Accept a raw severity code; out-of-range codes become `Unknown`
    fn severity_changed(&mut self, code: i64);
    fn severity(&self) -> Severity;
}

/// A value captured in `FixedRate` mode, waiting for the next tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSample {
    pub value: f64,
    /// Wall-clock arrival time in seconds
    pub received_at: f64,
}

/// Serializable description of a series, used in plot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    /// Channel address, e.g. `ca://SR:CURRENT`
    #[serde(default)]
    pub channel: Option<String>,

    /// Display name; the protocol-less address when unset
    #[serde(default)]
    pub name: Option<String>,

    /// Requested buffer capacity (clamped on use)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: i64,

    #[serde(default)]
    pub update_mode: UpdateMode,

    #[serde(default)]
    pub style: PlotStyle,

    /// Bar width in seconds, used by `Bar` series only
    #[serde(default = "default_bar_width")]
    pub bar_width: f64,

    /// RGBA color; generated from the series id when unset
    #[serde(default)]
    pub color: Option<[u8; 4]>,
}

fn default_buffer_size() -> i64 {
    DEFAULT_CAPACITY as i64
}

fn default_bar_width() -> f64 {
    1.0
}

impl SeriesDescriptor {
    pub fn for_channel(address: impl Into<String>) -> Self {
        Self {
            channel: Some(address.into()),
            ..Default::default()
        }
    }
}

impl Default for SeriesDescriptor {
    fn default() -> Self {
        Self {
            channel: None,
            name: None,
            buffer_size: default_buffer_size(),
            update_mode: UpdateMode::default(),
            style: PlotStyle::default(),
            bar_width: default_bar_width(),
            color: None,
        }
    }
}

/// One plotted series
#[derive(Debug, Clone)]
pub struct SeriesState {
    id: SeriesId,
    name: Option<String>,
    address: Option<String>,
    buffer: SampleBuffer,
    connected: bool,
    severity: Severity,
    severity_raw: Option<i64>,
    update_mode: UpdateMode,
    pending: Option<PendingSample>,
    style: PlotStyle,
    bar_width: f64,
    color: [u8; 4],
}

impl Default for SeriesState {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesState {
    /// Create a series with no channel and the default capacity
    pub fn new() -> Self {
        let id = SeriesId::next();
        Self {
            id,
            name: None,
            address: None,
            buffer: SampleBuffer::new(DEFAULT_CAPACITY as i64),
            connected: false,
            severity: Severity::Unknown,
            severity_raw: None,
            update_mode: UpdateMode::OnArrival,
            pending: None,
            style: PlotStyle::Line,
            bar_width: default_bar_width(),
            color: generate_color(id.0),
        }
    }

    /// Create a series bound to a channel address
    pub fn for_channel(address: impl Into<String>) -> Self {
        let mut series = Self::new();
        series.set_address(address);
        series
    }

    /// Build a series from its serialized description
    pub fn from_descriptor(desc: &SeriesDescriptor) -> Self {
        let mut series = Self::new()
            .with_capacity(desc.buffer_size)
            .with_update_mode(desc.update_mode)
            .with_style(desc.style)
            .with_bar_width(desc.bar_width);
        if let Some(channel) = &desc.channel {
            series.set_address(channel.as_str());
        }
        if let Some(name) = desc.name.as_deref().filter(|n| !n.is_empty()) {
            series.name = Some(name.to_string());
        }
        if let Some(color) = desc.color {
            series.color = color;
        }
        series
    }

    /// Set an explicit display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Set the buffer capacity (clamped)
    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.buffer.set_capacity(capacity);
        self
    }

    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.set_update_mode(mode);
        self
    }

    pub fn with_style(mut self, style: PlotStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the bar width; non-positive widths are ignored
    pub fn with_bar_width(mut self, width: f64) -> Self {
        if width.is_finite() && width > 0.0 {
            self.bar_width = width;
        }
        self
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn id(&self) -> SeriesId {
        self.id
    }

    /// Display name: the explicit name, else the address without protocol
    pub fn name(&self) -> &str {
        match (&self.name, &self.address) {
            (Some(name), _) => name.as_str(),
            (None, Some(address)) => remove_protocol(address),
            (None, None) => "",
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Rebind to a new address; an empty address unbinds the series
    pub fn set_address(&mut self, address: impl Into<String>) {
        let address = address.into();
        self.address = if address.is_empty() { None } else { Some(address) };
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut SampleBuffer {
        &mut self.buffer
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Resize the buffer; returns the effective capacity
    pub fn set_capacity(&mut self, capacity: i64) -> usize {
        self.buffer.set_capacity(capacity)
    }

    /// Restore the default capacity
    pub fn reset_capacity(&mut self) -> usize {
        self.buffer.set_capacity(DEFAULT_CAPACITY as i64)
    }

    /// Drop all samples and any pending value
    pub fn clear(&mut self) {
        self.buffer.reset();
        self.pending = None;
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    /// Switch update modes
    ///
    /// Buffered samples are never moved. Leaving `FixedRate` discards the
    /// pending value.
    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        if mode == UpdateMode::OnArrival && self.pending.take().is_some() {
            tracing::debug!("Series {} discarded pending value on mode change", self.id);
        }
        self.update_mode = mode;
    }

    pub fn pending(&self) -> Option<PendingSample> {
        self.pending
    }

    /// Handle a new value from the channel
    ///
    /// Returns true when the buffer changed and a redraw is needed.
    pub fn on_value_arrival(&mut self, value: f64, time: f64) -> bool {
        match self.update_mode {
            UpdateMode::OnArrival => {
                self.buffer.append(time, value);
                true
            }
            UpdateMode::FixedRate => {
                self.pending = Some(PendingSample {
                    value,
                    received_at: time,
                });
                false
            }
        }
    }

    /// Flush the pending value on a scheduler tick (`FixedRate` only)
    ///
    /// Returns true when a sample was appended.
    pub fn on_scheduler_tick(&mut self, now: f64) -> bool {
        if self.update_mode != UpdateMode::FixedRate {
            return false;
        }
        match self.pending.take() {
            Some(sample) => {
                tracing::trace!(
                    "Series {} flushed value {} ({:.3}s after arrival)",
                    self.id,
                    sample.value,
                    now - sample.received_at
                );
                self.buffer.append(now, sample.value);
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn set_connection_state(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Raw code of the last severity update, `None` if never set or invalid
    pub fn severity_raw(&self) -> Option<i64> {
        self.severity_raw
    }

    pub fn set_severity(&mut self, code: i64) {
        self.severity = Severity::from_code(code);
        self.severity_raw = self.severity.code();
    }

    /// Severity update from an untyped payload; unparseable input is `Unknown`
    pub fn set_severity_value(&mut self, value: &ChannelValue) {
        match value.as_code() {
            Some(code) => self.set_severity(code),
            None => {
                tracing::debug!("Series {} got unparseable severity {:?}", self.id, value);
                self.severity = Severity::Unknown;
                self.severity_raw = None;
            }
        }
    }

    pub fn style(&self) -> PlotStyle {
        self.style
    }

    pub fn bar_width(&self) -> f64 {
        self.bar_width
    }

    pub fn color(&self) -> [u8; 4] {
        self.color
    }

    /// Describe this series for serialization
    pub fn descriptor(&self) -> SeriesDescriptor {
        SeriesDescriptor {
            channel: self.address.clone(),
            name: Some(self.name().to_string()).filter(|n| !n.is_empty()),
            buffer_size: self.buffer.capacity() as i64,
            update_mode: self.update_mode,
            style: self.style,
            bar_width: self.bar_width,
            color: Some(self.color),
        }
    }

    /// Hover text for the series legend entry
    pub fn tooltip(&self, mode: AppMode) -> String {
        let mut text = match self.address() {
            Some(address) => format!("{}\n{}", self.name(), address),
            None => self.name().to_string(),
        };
        if !self.connected {
            text.push_str("\nDisconnected");
        } else if self.severity.is_known() {
            text.push_str(&format!("\nSeverity: {}", self.severity));
        }
        if mode == AppMode::ReadOnly {
            text.push_str("\nRead-only mode");
        }
        text
    }
}

impl ConnectionAware for SeriesState {
    fn connection_changed(&mut self, connected: bool) {
        self.set_connection_state(connected);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl AlarmAware for SeriesState {
    fn severity_changed(&mut self, code: i64) {
        self.set_severity(code);
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MINIMUM_CAPACITY;

    #[test]
    fn test_new_series_defaults() {
        let series = SeriesState::new();
        assert!(!series.is_connected());
        assert_eq!(series.update_mode(), UpdateMode::OnArrival);
        assert_eq!(series.severity(), Severity::Unknown);
        assert!(series.severity_raw().is_none());
        assert!(series.pending().is_none());
        assert!(series.address().is_none());
        assert_eq!(series.name(), "");
        assert_eq!(series.capacity(), DEFAULT_CAPACITY);
        assert!(series.buffer().is_empty());
    }

    #[test]
    fn test_name_defaults_to_address_without_protocol() {
        let series = SeriesState::for_channel("ca://test_value:Float");
        assert_eq!(series.address(), Some("ca://test_value:Float"));
        assert_eq!(series.name(), "test_value:Float");

        let named = SeriesState::for_channel("ca://test_value:Float").with_name("test_name");
        assert_eq!(named.name(), "test_name");

        let blank = SeriesState::for_channel("ca://test_value:Float").with_name("");
        assert_eq!(blank.name(), "test_value:Float");
    }

    #[test]
    fn test_empty_address_unbinds() {
        let mut series = SeriesState::for_channel("ca://a");
        series.set_address("");
        assert!(series.address().is_none());
    }

    #[test]
    fn test_on_arrival_appends() {
        let mut series = SeriesState::new();
        assert!(series.on_value_arrival(-10.0, 1.0));
        assert_eq!(series.buffer().len(), 1);
        assert_eq!(series.buffer().value_row()[series.capacity() - 1], -10.0);
        assert!(!series.on_scheduler_tick(2.0));
        assert_eq!(series.buffer().len(), 1);
    }

    #[test]
    fn test_fixed_rate_keeps_only_latest() {
        let mut series = SeriesState::new().with_update_mode(UpdateMode::FixedRate);
        assert!(!series.on_value_arrival(100.0, 1.0));
        assert!(!series.on_value_arrival(-123.456, 1.5));
        assert!(series.buffer().is_empty());
        assert_eq!(series.pending().map(|p| p.value), Some(-123.456));

        assert!(series.on_scheduler_tick(2.0));
        assert_eq!(series.buffer().len(), 1);
        assert_eq!(series.buffer().last(), Some((2.0, -123.456)));
        assert!(series.pending().is_none());

        // Nothing pending: tick is a no-op
        assert!(!series.on_scheduler_tick(3.0));
        assert_eq!(series.buffer().len(), 1);
    }

    #[test]
    fn test_mode_switch_keeps_buffer_and_drops_pending() {
        let mut series = SeriesState::new();
        series.on_value_arrival(1.0, 1.0);
        series.on_value_arrival(2.0, 2.0);

        series.set_update_mode(UpdateMode::FixedRate);
        assert_eq!(series.buffer().len(), 2);
        series.on_value_arrival(3.0, 3.0);
        assert!(series.pending().is_some());

        series.set_update_mode(UpdateMode::OnArrival);
        assert!(series.pending().is_none());
        assert_eq!(series.buffer().len(), 2);
    }

    #[test]
    fn test_severity_codes() {
        let mut series = SeriesState::new();
        series.set_severity(2);
        assert_eq!(series.severity(), Severity::Major);
        assert_eq!(series.severity_raw(), Some(2));

        series.set_severity(-1);
        assert_eq!(series.severity(), Severity::Unknown);
        assert!(series.severity_raw().is_none());

        series.set_severity_value(&ChannelValue::from("1"));
        assert_eq!(series.severity(), Severity::Minor);

        series.set_severity_value(&ChannelValue::from("not_an_int"));
        assert_eq!(series.severity().to_string(), "N/A");

        series.set_severity_value(&ChannelValue::Unsupported);
        assert_eq!(series.severity(), Severity::Unknown);
    }

    #[test]
    fn test_capability_traits() {
        fn drive<T: ConnectionAware + AlarmAware>(item: &mut T) {
            item.connection_changed(true);
            item.severity_changed(3);
        }

        let mut series = SeriesState::new();
        drive(&mut series);
        assert!(ConnectionAware::is_connected(&series));
        assert_eq!(AlarmAware::severity(&series), Severity::Invalid);
    }

    #[test]
    fn test_capacity_changes() {
        let mut series = SeriesState::new();
        assert_eq!(series.set_capacity(0), MINIMUM_CAPACITY);
        assert_eq!(series.set_capacity(-5), MINIMUM_CAPACITY);
        assert_eq!(series.set_capacity(6001), 6001);
        assert_eq!(series.reset_capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_descriptor_round_trip() {
        let series = SeriesState::for_channel("ca://SR:CURRENT")
            .with_capacity(1200)
            .with_style(PlotStyle::Bar)
            .with_bar_width(0.5)
            .with_update_mode(UpdateMode::FixedRate);

        let desc = series.descriptor();
        assert_eq!(desc.channel.as_deref(), Some("ca://SR:CURRENT"));
        assert_eq!(desc.name.as_deref(), Some("SR:CURRENT"));
        assert_eq!(desc.buffer_size, 1200);

        let json = serde_json::to_string(&desc).unwrap();
        let parsed: SeriesDescriptor = serde_json::from_str(&json).unwrap();
        let rebuilt = SeriesState::from_descriptor(&parsed);
        assert_eq!(rebuilt.capacity(), 1200);
        assert_eq!(rebuilt.style(), PlotStyle::Bar);
        assert_eq!(rebuilt.bar_width(), 0.5);
        assert_eq!(rebuilt.update_mode(), UpdateMode::FixedRate);
        assert_eq!(rebuilt.color(), series.color());
        assert_ne!(rebuilt.id(), series.id());
    }

    #[test]
    fn test_descriptor_defaults_from_minimal_json() {
        let desc: SeriesDescriptor = serde_json::from_str(r#"{"channel": "loc://x"}"#).unwrap();
        assert_eq!(desc.buffer_size, DEFAULT_CAPACITY as i64);
        assert_eq!(desc.style, PlotStyle::Line);
        assert!(desc.name.is_none());
    }

    #[test]
    fn test_tooltip_uses_explicit_mode() {
        let mut series = SeriesState::for_channel("ca://X:Y");
        assert!(series.tooltip(AppMode::Normal).contains("Disconnected"));

        series.set_connection_state(true);
        series.set_severity(1);
        let text = series.tooltip(AppMode::ReadOnly);
        assert!(text.contains("ca://X:Y"));
        assert!(text.contains("MINOR"));
        assert!(text.contains("Read-only"));
        assert!(!series.tooltip(AppMode::Normal).contains("Read-only"));
    }
}
