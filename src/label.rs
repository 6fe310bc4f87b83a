//! Cursor labels
//!
//! With the crosshair enabled, every series gets a text label that follows
//! the cursor and shows the sample nearest to it. Labels are built lazily:
//! enabling the crosshair only flags them for initialization, and the first
//! cursor update after that builds one label per attached series.

use crate::item::{series_of, PlotItem};
use crate::series::SeriesState;
use crate::types::SeriesId;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Text of a label that has not been queried yet
pub const NO_DATA_INITIAL: &str = "No data";

/// Text of a label whose series has nothing at the cursor
pub const NO_DATA_IN_RANGE: &str = "No data!";

/// How label text is rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelFormat {
    /// Digits after the decimal point
    #[serde(default = "default_precision")]
    pub precision: usize,
    /// chrono format string for the sample time, rendered in local time
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_precision() -> usize {
    3
}

/// Timestamp format used when none, or an invalid one, is configured
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

/// Whether chrono can render every specifier in `format`
pub fn is_valid_timestamp_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

impl Default for LabelFormat {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

/// Render an epoch-seconds time with a chrono format string
///
/// A format chrono rejects falls back to [`DEFAULT_TIMESTAMP_FORMAT`].
pub fn format_timestamp(secs: f64, format: &str) -> String {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    let Some(utc) = DateTime::from_timestamp(whole as i64, nanos) else {
        return format!("{secs}");
    };
    let local = utc.with_timezone(&Local);
    let mut out = String::new();
    if write!(out, "{}", local.format(format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", local.format(DEFAULT_TIMESTAMP_FORMAT));
    }
    out
}

/// A single on-screen label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelHandle {
    pub text: String,
    /// Data coordinates the label is pinned to
    pub anchor: Option<(f64, f64)>,
}

impl Default for LabelHandle {
    fn default() -> Self {
        Self {
            text: NO_DATA_INITIAL.to_string(),
            anchor: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelEngine {
    labels: BTreeMap<SeriesId, LabelHandle>,
    enabled: bool,
    needs_init: bool,
    format: LabelFormat,
}

impl LabelEngine {
    pub fn new(format: LabelFormat) -> Self {
        Self {
            format: format.validated(),
            ..Self::default()
        }
    }

    pub fn format(&self) -> &LabelFormat {
        &self.format
    }

    pub fn set_format(&mut self, format: LabelFormat) {
        self.format = format.validated();
    }

    /// Turn labels on or off
    ///
    /// Enabling drops any existing labels and defers building new ones to
    /// the next cursor update. Disabling removes them immediately.
    pub fn enable(&mut self, on: bool) {
        self.labels.clear();
        self.enabled = on;
        self.needs_init = on;
        tracing::debug!("Cursor labels {}", if on { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn needs_init(&self) -> bool {
        self.needs_init
    }

    /// One fresh label per series in `items`; markers get none
    pub fn rebuild_labels(&mut self, items: &[PlotItem]) {
        self.labels = series_of(items)
            .map(|series| (series.id(), LabelHandle::default()))
            .collect();
        self.needs_init = false;
    }

    pub fn clear_labels(&mut self) {
        self.labels.clear();
        self.needs_init = true;
    }

    /// Point every label at the sample nearest to `cursor_x`
    pub fn update_label(&mut self, cursor_x: f64, cursor_y: f64, items: &[PlotItem]) {
        if !cursor_x.is_finite() {
            return;
        }

        for series in series_of(items) {
            let Some(handle) = self.labels.get_mut(&series.id()) else {
                continue;
            };
            match nearest_in_range(series, cursor_x) {
                Some((t, v)) => {
                    handle.text = self.format.render(series, t, v);
                    handle.anchor = Some((t, cursor_y));
                }
                None => {
                    handle.text = NO_DATA_IN_RANGE.to_string();
                    handle.anchor = None;
                }
            }
        }
    }

    pub fn label(&self, series: SeriesId) -> Option<&LabelHandle> {
        self.labels.get(&series)
    }

    pub fn text(&self, series: SeriesId) -> Option<&str> {
        self.labels.get(&series).map(|h| h.text.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = (SeriesId, &LabelHandle)> {
        self.labels.iter().map(|(id, h)| (*id, h))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl LabelFormat {
    /// Replace a timestamp format chrono cannot render with the default
    pub fn validated(mut self) -> Self {
        if !is_valid_timestamp_format(&self.timestamp_format) {
            tracing::warn!(
                "Invalid label timestamp format {:?}, using {:?}",
                self.timestamp_format,
                DEFAULT_TIMESTAMP_FORMAT
            );
            self.timestamp_format = default_timestamp_format();
        }
        self
    }

    fn render(&self, series: &SeriesState, time: f64, value: f64) -> String {
        let mut text = format!(
            "{}\n{:.prec$}",
            format_timestamp(time, &self.timestamp_format),
            value,
            prec = self.precision
        );
        let severity = series.severity();
        if severity.is_known() {
            text.push('\n');
            text.push_str(severity.name());
        }
        text
    }
}

fn nearest_in_range(series: &SeriesState, x: f64) -> Option<(f64, f64)> {
    let (lo, hi) = series.buffer().time_range()?;
    if x < lo || x > hi {
        return None;
    }
    series.buffer().nearest(x)
}
