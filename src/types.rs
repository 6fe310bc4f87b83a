//! Core data types for pvtrend
//!
//! This module contains the small value types shared by every part of the
//! plot core: series identities, alarm severities, update modes, plot
//! styles and the tagged channel value.
//!
//! # Main Types
//!
//! - [`SeriesId`] - Process-unique identity of a plotted series
//! - [`Severity`] - Alarm severity of a channel, with an explicit `Unknown`
//! - [`UpdateMode`] - Whether samples are buffered on arrival or on a timer
//! - [`PlotStyle`] - Line or bar rendering of a series
//! - [`ChannelValue`] - Value payload resolved once at the channel boundary
//! - [`AppMode`] - Application mode passed explicitly to tooltip checks
//!
//! # Time
//!
//! Sample times are `f64` seconds since the Unix epoch, the same unit the
//! channel layer stamps values with. [`now_secs`] reads the wall clock.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// Global counter for generating unique series IDs
static NEXT_SERIES_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a series attached to a plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesId(pub u32);

impl SeriesId {
    /// Allocate the next unused id
    pub fn next() -> Self {
        SeriesId(NEXT_SERIES_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Alarm severity reported by a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Severity {
    NoAlarm,
    Minor,
    Major,
    Invalid,
    Disconnected,
    /// Out-of-range or missing code (including the `-1` sentinel)
    #[default]
    Unknown,
}

impl Severity {
    /// Map a raw severity code. Codes outside `0..=4` become `Unknown`;
    /// sources emit those transiently while reconnecting.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Severity::NoAlarm,
            1 => Severity::Minor,
            2 => Severity::Major,
            3 => Severity::Invalid,
            4 => Severity::Disconnected,
            _ => Severity::Unknown,
        }
    }

    /// Raw code for this severity, `None` for `Unknown`
    pub fn code(&self) -> Option<i64> {
        match self {
            Severity::NoAlarm => Some(0),
            Severity::Minor => Some(1),
            Severity::Major => Some(2),
            Severity::Invalid => Some(3),
            Severity::Disconnected => Some(4),
            Severity::Unknown => None,
        }
    }

    /// Whether this is a recognized alarm state
    pub fn is_known(&self) -> bool {
        !matches!(self, Severity::Unknown)
    }

    /// Label used in cursor text and tooltips
    pub fn name(&self) -> &'static str {
        match self {
            Severity::NoAlarm => "NO_ALARM",
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Invalid => "INVALID",
            Severity::Disconnected => "DISCONNECTED",
            Severity::Unknown => "N/A",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// When incoming values reach the sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Every arriving value is appended immediately
    #[default]
    OnArrival,
    /// Only the latest value is kept and appended on each scheduler tick
    FixedRate,
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateMode::OnArrival => write!(f, "On Arrival"),
            UpdateMode::FixedRate => write!(f, "Fixed Rate"),
        }
    }
}

/// How a series is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlotStyle {
    /// Continuous line; always receives the full valid window
    #[default]
    Line,
    /// Bar set; receives only samples inside the visible x-range
    Bar,
}

impl std::fmt::Display for PlotStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlotStyle::Line => write!(f, "Line"),
            PlotStyle::Bar => write!(f, "Bar"),
        }
    }
}

/// Application mode, passed to whatever needs it instead of read from a
/// process-wide flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppMode {
    #[default]
    Normal,
    ReadOnly,
}

/// Value payload delivered by a channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValue {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Arrays, structures and anything else a trend cannot plot
    Unsupported,
}

impl ChannelValue {
    /// Numeric value for plotting. Text is parsed after trimming; anything
    /// else yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ChannelValue::Integer(v) => Some(*v as f64),
            ChannelValue::Float(v) => Some(*v),
            ChannelValue::Text(s) => s.trim().parse::<f64>().ok(),
            ChannelValue::Unsupported => None,
        }
    }

    /// Integer code, used for severity updates. Floats must be integral.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            ChannelValue::Integer(v) => Some(*v),
            ChannelValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            ChannelValue::Float(_) => None,
            ChannelValue::Text(s) => s.trim().parse::<i64>().ok(),
            ChannelValue::Unsupported => None,
        }
    }
}

impl From<f64> for ChannelValue {
    fn from(v: f64) -> Self {
        ChannelValue::Float(v)
    }
}

impl From<i64> for ChannelValue {
    fn from(v: i64) -> Self {
        ChannelValue::Integer(v)
    }
}

impl From<&str> for ChannelValue {
    fn from(v: &str) -> Self {
        ChannelValue::Text(v.to_string())
    }
}

/// Current wall-clock time in seconds since the Unix epoch
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Strip a `proto://` prefix from a channel address
pub fn remove_protocol(address: &str) -> &str {
    match address.find("://") {
        Some(idx) => &address[idx + 3..],
        None => address,
    }
}

/// Generate a distinct color based on an index/ID
/// Uses the golden ratio to spread hues evenly across the color wheel
pub fn generate_color(index: u32) -> [u8; 4] {
    const GOLDEN_RATIO: f32 = 0.618033988749895;

    let hue = ((index as f32 * GOLDEN_RATIO) % 1.0) * 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.85);
    [r, g, b, 255]
}

/// Convert HSV (hue 0-360, saturation 0-1, value 0-1) to RGB (u8, u8, u8)
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (u8, u8, u8) {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_valid_codes() {
        assert_eq!(Severity::from_code(0), Severity::NoAlarm);
        assert_eq!(Severity::from_code(1), Severity::Minor);
        assert_eq!(Severity::from_code(2), Severity::Major);
        assert_eq!(Severity::from_code(3), Severity::Invalid);
        assert_eq!(Severity::from_code(4), Severity::Disconnected);
    }

    #[test]
    fn test_severity_out_of_range_is_unknown() {
        assert_eq!(Severity::from_code(-1), Severity::Unknown);
        assert_eq!(Severity::from_code(5), Severity::Unknown);
        assert_eq!(Severity::from_code(i64::MAX), Severity::Unknown);
        assert_eq!(Severity::Unknown.to_string(), "N/A");
        assert!(Severity::Unknown.code().is_none());
    }

    #[test]
    fn test_severity_names() {
        assert_eq!(Severity::Major.to_string(), "MAJOR");
        assert_eq!(Severity::NoAlarm.name(), "NO_ALARM");
    }

    #[test]
    fn test_channel_value_as_f64() {
        assert_eq!(ChannelValue::Integer(-10).as_f64(), Some(-10.0));
        assert_eq!(ChannelValue::Float(10.2333).as_f64(), Some(10.2333));
        assert_eq!(ChannelValue::from(" 4.5 ").as_f64(), Some(4.5));
        assert_eq!(ChannelValue::from("not_a_number").as_f64(), None);
        assert_eq!(ChannelValue::Unsupported.as_f64(), None);
    }

    #[test]
    fn test_channel_value_as_code() {
        assert_eq!(ChannelValue::from("1").as_code(), Some(1));
        assert_eq!(ChannelValue::Float(2.0).as_code(), Some(2));
        assert_eq!(ChannelValue::Float(2.5).as_code(), None);
        assert_eq!(ChannelValue::from("not_an_int").as_code(), None);
    }

    #[test]
    fn test_remove_protocol() {
        assert_eq!(remove_protocol("ca://test_value:Float"), "test_value:Float");
        assert_eq!(remove_protocol("loc://a://b"), "a://b");
        assert_eq!(remove_protocol("plain:pv"), "plain:pv");
    }

    #[test]
    fn test_series_ids_are_unique() {
        let a = SeriesId::next();
        let b = SeriesId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_generate_color_is_opaque() {
        for i in 0..16 {
            assert_eq!(generate_color(i)[3], 255);
        }
        assert_ne!(generate_color(1), generate_color(2));
    }
}
