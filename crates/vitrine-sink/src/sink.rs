//! The pipeline-facing sink adapter.
//!
//! `GlesSink` is the one concrete sink: it negotiates formats, owns the
//! render thread's lifecycle, applies the drop-first policy, and carries the
//! property surface (silent flag, crop, drop count). The delivery thread
//! calls it; it never touches GPU state itself.

use tracing::{debug, info, trace, warn};

use vitrine_core::{
    CropInsets, DisplayGeometry, Frame, SinkConfig, SinkError, VideoFormat,
};

use crate::thread::RenderThread;

/// The consumer contract a host pipeline drives.
///
/// One concrete implementation exists ([`GlesSink`]); the trait is the seam
/// a pipeline harness or a test double attaches to.
pub trait VideoSink {
    fn start(&mut self) -> Result<(), SinkError>;
    fn stop(&mut self);
    fn set_format(&mut self, format: &VideoFormat) -> Result<(), SinkError>;
    fn preroll(&mut self, buf: &[u8]) -> Result<(), SinkError>;
    fn render(&mut self, buf: &[u8]) -> Result<(), SinkError>;
}

/// Invoked once after GPU/window setup with the exported native window id.
pub type WindowHandleCallback = Box<dyn FnMut(u64) + Send>;

pub struct GlesSink {
    config: SinkConfig,
    geometry: Option<DisplayGeometry>,
    thread: Option<RenderThread>,
    dropped: u32,
    on_window_handle: Option<WindowHandleCallback>,
}

impl std::fmt::Debug for GlesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlesSink")
            .field("config", &self.config)
            .field("geometry", &self.geometry)
            .field("thread", &self.thread)
            .field("dropped", &self.dropped)
            .field(
                "on_window_handle",
                &self.on_window_handle.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl GlesSink {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            geometry: None,
            thread: None,
            dropped: 0,
            on_window_handle: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SinkConfig::default())
    }

    // ---- property surface ----

    pub fn silent(&self) -> bool {
        self.config.silent
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.config.silent = silent;
    }

    pub fn crop(&self) -> CropInsets {
        self.config.crop
    }

    pub fn set_crop(&mut self, crop: CropInsets) {
        self.config.crop = crop;
        if let Some(thread) = &self.thread {
            thread.set_crop(crop);
        }
    }

    pub fn drop_first(&self) -> u32 {
        self.config.drop_first
    }

    pub fn set_drop_first(&mut self, count: u32) {
        self.config.drop_first = count;
    }

    /// Frames discarded so far by the drop-first policy.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Registers the callback announcing the native window id to an
    /// embedding application once the window exists.
    pub fn set_window_handle_callback(&mut self, callback: WindowHandleCallback) {
        self.on_window_handle = Some(callback);
    }

    /// Accepting an externally supplied window is advertised but not
    /// implemented: the render thread always creates its own window. The
    /// operation exists and deterministically fails.
    pub fn set_window_handle(&mut self, _handle: u64) -> Result<(), SinkError> {
        warn!("external window handle offered; not supported");
        Err(SinkError::ExternalWindowUnsupported)
    }

    /// Native id of the sink's own window, once setup has run.
    pub fn window_id(&self) -> Option<u64> {
        self.thread.as_ref().and_then(|t| t.native_id())
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Spins up the render thread if it is not already running. The first
    /// successful spin-up announces the window handle.
    fn ensure_thread(&mut self) -> Result<&RenderThread, SinkError> {
        let stale = matches!(&self.thread, Some(t) if !t.is_running());
        if stale {
            // A thread that died (failed or was stopped elsewhere) is not
            // restarted implicitly; surface the error flow instead.
            return Err(SinkError::RenderThread(
                "render thread is not running".into(),
            ));
        }

        if self.thread.is_none() {
            let geometry = self.geometry.ok_or_else(|| {
                SinkError::RenderThread("no negotiated format before render".into())
            })?;
            let thread = RenderThread::spawn(&self.config, geometry)?;
            if let (Some(callback), Some(id)) = (&mut self.on_window_handle, thread.native_id()) {
                callback(id);
            }
            self.thread = Some(thread);
        }

        Ok(self.thread.as_ref().expect("just ensured"))
    }
}

impl VideoSink for GlesSink {
    fn start(&mut self) -> Result<(), SinkError> {
        debug!("sink started");
        Ok(())
    }

    /// Stops and joins the render thread (which tears down poller, GL
    /// context, and window on its way out). Safe when never started.
    fn stop(&mut self) {
        if let Some(mut thread) = self.thread.take() {
            thread.stop();
        }
        self.dropped = 0;
        debug!("sink stopped");
    }

    /// Format negotiation. Accepts only planar I420 with PAR metadata and
    /// computes the display geometry the draw passes use from then on.
    fn set_format(&mut self, format: &VideoFormat) -> Result<(), SinkError> {
        let geometry = DisplayGeometry::negotiate(format)?;

        info!(
            width = geometry.video_width,
            height = geometry.video_height,
            par_n = geometry.par.num,
            par_d = geometry.par.den,
            display_width = geometry.display_width,
            "format negotiated"
        );

        // Geometry must not change under a live context; a renegotiation
        // tears the thread down and the next render starts a fresh one.
        if self.geometry != Some(geometry) {
            if let Some(mut thread) = self.thread.take() {
                debug!("geometry changed, restarting render thread");
                thread.stop();
            }
            self.geometry = Some(geometry);
        }

        Ok(())
    }

    fn preroll(&mut self, _buf: &[u8]) -> Result<(), SinkError> {
        trace!("preroll");
        Ok(())
    }

    /// Renders one frame: validates the buffer against the negotiated
    /// layout, applies the drop-first policy, then performs the blocking
    /// handoff to the render thread.
    fn render(&mut self, buf: &[u8]) -> Result<(), SinkError> {
        let geometry = self
            .geometry
            .ok_or_else(|| SinkError::RenderThread("render before negotiation".into()))?;

        let frame = Frame::new(geometry.layout(), buf)?;

        if self.dropped < self.config.drop_first {
            self.dropped += 1;
            trace!(dropped = self.dropped, "dropping leading frame");
            return Ok(());
        }

        if !self.config.silent {
            trace!(len = buf.len(), "render");
        }

        let thread = self.ensure_thread()?;
        thread.render(&frame)
    }
}

impl Drop for GlesSink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::{Par, PixelFormat};

    #[test]
    fn set_format_rejects_unsupported_formats() {
        let mut sink = GlesSink::with_defaults();
        let req = VideoFormat {
            format: PixelFormat::Rgba,
            width: 720,
            height: 576,
            par: Some(Par::SQUARE),
        };
        assert!(matches!(
            sink.set_format(&req),
            Err(SinkError::Negotiation(_))
        ));

        let req = VideoFormat {
            format: PixelFormat::I420,
            width: 720,
            height: 576,
            par: None,
        };
        assert!(matches!(
            sink.set_format(&req),
            Err(SinkError::Negotiation(_))
        ));
    }

    #[test]
    fn render_before_negotiation_is_an_error() {
        let mut sink = GlesSink::with_defaults();
        assert!(sink.render(&[0u8; 16]).is_err());
    }

    #[test]
    fn render_rejects_mismatched_buffer_length() {
        let mut sink = GlesSink::with_defaults();
        sink.set_format(&VideoFormat::i420(720, 576, 1, 1)).unwrap();
        // Wrong length fails before any thread is spun up.
        let err = sink.render(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, SinkError::InvalidFrame { expected, .. }
            if expected == 720 * 576 + 2 * (360 * 288)));
    }

    #[test]
    fn drop_first_short_circuits_without_a_thread() {
        let mut sink = GlesSink::with_defaults();
        sink.set_drop_first(2);
        sink.set_format(&VideoFormat::i420(64, 64, 1, 1)).unwrap();

        let buf = vec![0u8; 64 * 64 + 2 * (32 * 32)];
        sink.render(&buf).unwrap();
        sink.render(&buf).unwrap();
        assert_eq!(sink.dropped(), 2);
        assert!(sink.window_id().is_none());
    }

    #[test]
    fn external_window_handles_are_rejected() {
        let mut sink = GlesSink::with_defaults();
        assert!(matches!(
            sink.set_window_handle(0xdead),
            Err(SinkError::ExternalWindowUnsupported)
        ));
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let mut sink = GlesSink::with_defaults();
        sink.stop();
        sink.stop();
    }

    #[test]
    fn properties_pass_through() {
        let mut sink = GlesSink::with_defaults();
        assert!(!sink.silent());
        sink.set_silent(true);
        assert!(sink.silent());

        let crop = CropInsets {
            top: 2,
            bottom: 2,
            left: 4,
            right: 4,
        };
        sink.set_crop(crop);
        assert_eq!(sink.crop(), crop);
    }
}
