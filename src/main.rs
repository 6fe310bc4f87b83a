//! pvtrend demo - Main Entry Point
//!
//! Runs a plot against simulated channels and a surface that only logs what
//! it would draw. Usage: `pvtrend [CONFIG] [SECONDS]`.

use anyhow::Context;
use pvtrend::{
    config::{self, PlotConfig},
    types::now_secs,
    ChannelBridge, ChannelSender, RenderSurface, Result, SeriesId, TimePlot,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_RUN_SECS: u64 = 5;
const LOOP_INTERVAL: Duration = Duration::from_millis(5);

/// Surface that logs a summary of each delivery
#[derive(Default)]
struct LoggingSurface {
    visible: Option<(f64, f64)>,
    deliveries: u64,
}

impl RenderSurface for LoggingSurface {
    fn set_line_data(&mut self, series: SeriesId, x: &[f64], y: &[f64]) -> Result<()> {
        self.deliveries += 1;
        if let (Some(t), Some(v)) = (x.last(), y.last()) {
            tracing::debug!("{}: {} points, last ({:.3}, {:.3})", series, x.len(), t, v);
        }
        Ok(())
    }

    fn set_bar_data(
        &mut self,
        series: SeriesId,
        x: &[f64],
        height: &[f64],
        width: f64,
    ) -> Result<()> {
        self.deliveries += 1;
        let peak = height.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        tracing::debug!("{}: {} bars of width {}, peak {:.3}", series, x.len(), width, peak);
        Ok(())
    }

    fn visible_x_range(&self) -> Option<(f64, f64)> {
        self.visible
    }

    fn set_x_range(&mut self, lo: f64, hi: f64) -> Result<()> {
        self.visible = Some((lo, hi));
        Ok(())
    }
}

/// Feed a simulated channel until `running` is cleared
fn spawn_producer(
    sender: ChannelSender,
    series: SeriesId,
    rate_hz: f64,
    phase: f64,
    running: Arc<AtomicBool>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("producer-{}", series.0))
        .spawn(move || {
            let period = Duration::from_secs_f64(1.0 / rate_hz);
            let start = Instant::now();
            let _ = sender.on_connection(series, true);
            let _ = sender.on_severity(series, 0);
            while running.load(Ordering::Relaxed) {
                let t = start.elapsed().as_secs_f64();
                let value = 100.0 + 20.0 * (t * 2.0 + phase).sin();
                if let Err(e) = sender.on_value(series, value) {
                    tracing::warn!("Producer for {} dropped a value: {}", series, e);
                }
                if value > 118.0 {
                    let _ = sender.on_severity(series, 1);
                } else if value < 82.0 {
                    let _ = sender.on_severity(series, 0);
                }
                std::thread::sleep(period);
            }
            let _ = sender.on_connection(series, false);
        })
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pvtrend=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pvtrend demo");

    let mut args = std::env::args().skip(1);
    let config_path = match args.next() {
        Some(path) => Some(path.into()),
        None => config::default_config_path(),
    };
    let run_secs = match args.next() {
        Some(secs) => secs.parse().context("SECONDS must be a whole number")?,
        None => DEFAULT_RUN_SECS,
    };

    let mut config = match &config_path {
        Some(path) if path.exists() => {
            tracing::info!("Loading plot config from {:?}", path);
            PlotConfig::load(path).with_context(|| format!("loading {:?}", path))?
        }
        _ => PlotConfig::default(),
    };
    if config.curves.is_empty() {
        config.crosshair = true;
        config.add_curve("sim://DEMO:SINE");
        config.add_curve("sim://DEMO:COSINE");
    }

    let mut plot = TimePlot::from_config(&config);
    let bridge = ChannelBridge::new();
    let running = Arc::new(AtomicBool::new(true));

    let mut producers = Vec::new();
    for (i, id) in plot.series_ids().into_iter().enumerate() {
        let handle = spawn_producer(
            bridge.sender(),
            id,
            50.0,
            i as f64 * std::f64::consts::FRAC_PI_2,
            running.clone(),
        )
        .context("spawning producer thread")?;
        producers.push(handle);
    }

    let mut surface = LoggingSurface::default();
    let started = Instant::now();
    let deadline = started + Duration::from_secs(run_secs);

    while Instant::now() < deadline {
        let now = now_secs();
        bridge.drain_into(&mut plot);

        if let Some(report) = plot.poll(Instant::now(), now, &mut surface) {
            if !report.is_clean() {
                tracing::warn!("{} series failed to redraw", report.failed.len());
            }
        }

        // Sweep the cursor across the visible window
        if let Some((lo, hi)) = surface.visible {
            let sweep = started.elapsed().as_secs_f64() % 10.0 / 10.0;
            plot.update_label(lo + (hi - lo) * sweep, 0.0);
        }

        std::thread::sleep(LOOP_INTERVAL);
    }

    running.store(false, Ordering::Relaxed);
    for handle in producers {
        if handle.join().is_err() {
            tracing::warn!("Producer thread panicked");
        }
    }
    bridge.drain_into(&mut plot);

    for id in plot.series_ids() {
        if let Some(series) = plot.series(id) {
            tracing::info!(
                "{}: {} samples, label {:?}",
                series.name(),
                series.buffer().len(),
                plot.label_text(id)
            );
        }
    }
    tracing::info!(
        "Done: {} redraw passes, {} surface deliveries",
        plot.scheduler().passes(),
        surface.deliveries
    );

    if let Some(path) = config_path.filter(|p| !p.exists()) {
        config::ensure_app_data_dir().context("creating app data directory")?;
        plot.to_config()
            .save(&path)
            .with_context(|| format!("saving {:?}", path))?;
    }

    Ok(())
}
