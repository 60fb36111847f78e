//! Feeds synthetic animated I420 color bars through the sink: negotiate,
//! then render at a fixed rate for a few seconds.
//!
//! Usage: `sink_minimal [seconds]` (default 10).

use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::info;

use vitrine_core::{FrameLayout, SinkConfig, VideoFormat};
use vitrine_sink::{GlesSink, VideoSink};

const WIDTH: u32 = 720;
const HEIGHT: u32 = 576;
const FPS: u64 = 25;

// SMPTE-style bars as YUV triplets: white, yellow, cyan, green, magenta,
// red, blue, black.
const BARS: [(u8, u8, u8); 8] = [
    (235, 128, 128),
    (210, 16, 146),
    (170, 166, 16),
    (145, 54, 34),
    (106, 202, 222),
    (81, 90, 240),
    (41, 240, 110),
    (16, 128, 128),
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("[vitrine demo] error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let seconds: u64 = std::env::args()
        .nth(1)
        .map(|s| s.parse().context("seconds must be a number"))
        .transpose()?
        .unwrap_or(10);

    let mut sink = GlesSink::new(SinkConfig::default());
    sink.set_window_handle_callback(Box::new(|id| {
        info!(id, "got window handle");
    }));

    sink.start().context("start sink")?;
    sink.set_format(&VideoFormat::i420(WIDTH, HEIGHT, 1, 1))
        .context("negotiate I420")?;

    let layout = FrameLayout::new(WIDTH, HEIGHT);
    let mut buf = vec![0u8; layout.total_len()];
    let frame_interval = Duration::from_millis(1000 / FPS);
    let total_frames = seconds * FPS;

    info!(
        width = WIDTH,
        height = HEIGHT,
        fps = FPS,
        seconds,
        "rendering color bars"
    );

    for frame_num in 0..total_frames {
        let started = Instant::now();

        fill_color_bars(&mut buf, &layout, frame_num);
        sink.render(&buf).context("render frame")?;

        if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    sink.stop();
    info!(total_frames, "done");
    Ok(())
}

/// Writes one frame of color bars into an I420 buffer, shifting which bar
/// comes first every few frames so motion is visible.
fn fill_color_bars(buf: &mut [u8], layout: &FrameLayout, frame_num: u64) {
    let shift = (frame_num / 5) as usize;
    let bar_width = (layout.width as usize / BARS.len()).max(1);

    let (luma, chroma) = buf.split_at_mut(layout.luma_len());
    let (u_plane, v_plane) = chroma.split_at_mut(layout.chroma_len());

    for row in 0..layout.height as usize {
        let base = row * layout.width as usize;
        for col in 0..layout.width as usize {
            let bar = (col / bar_width + shift) % BARS.len();
            luma[base + col] = BARS[bar].0;
        }
    }

    let chroma_bar_width = (bar_width / 2).max(1);
    for row in 0..layout.chroma_height as usize {
        let base = row * layout.chroma_width as usize;
        for col in 0..layout.chroma_width as usize {
            let bar = (col / chroma_bar_width + shift) % BARS.len();
            u_plane[base + col] = BARS[bar].1;
            v_plane[base + col] = BARS[bar].2;
        }
    }
}
