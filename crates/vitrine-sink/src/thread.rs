//! The render thread: sole owner of the window and the GL context.
//!
//! Lifecycle: Setting Up (window, context, shaders, textures, FBO) →
//! Ready/Waiting ⇄ Drawing, until the stop signal → teardown. Setup
//! failures are fatal to the thread; it reports the error back once and
//! exits without entering the wait loop.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use tracing::{debug, error};

use vitrine_core::{CropInsets, DisplayGeometry, Frame, SinkConfig, SinkError};
use vitrine_glow::GlesContext;
use vitrine_host_winit::{NativeWindow, WindowError};

use crate::handoff::Handoff;

type SetupResult = Result<Option<u64>, SinkError>;

#[derive(Debug)]
pub struct RenderThread {
    handoff: Arc<Handoff>,
    crop: Arc<Mutex<CropInsets>>,
    native_id: Option<u64>,
    worker: Option<thread::JoinHandle<()>>,
}

impl RenderThread {
    /// Spawns the render thread and blocks until its GPU setup either
    /// succeeded (returning the exported native window id, when the
    /// platform has one) or failed (returning the setup error).
    pub fn spawn(config: &SinkConfig, geometry: DisplayGeometry) -> Result<Self, SinkError> {
        let handoff = Arc::new(Handoff::new());
        let crop = Arc::new(Mutex::new(config.crop));
        let (setup_tx, setup_rx) = mpsc::channel::<SetupResult>();

        let config = config.clone();
        let handoff_for_thread = Arc::clone(&handoff);
        let crop_for_thread = Arc::clone(&crop);

        let worker = thread::Builder::new()
            .name("vitrine-render".into())
            .spawn(move || {
                render_loop(config, geometry, handoff_for_thread, crop_for_thread, setup_tx)
            })
            .map_err(|e| SinkError::RenderThread(format!("spawn failed: {e}")))?;

        match setup_rx.recv() {
            Ok(Ok(native_id)) => Ok(Self {
                handoff,
                crop,
                native_id,
                worker: Some(worker),
            }),
            Ok(Err(err)) => {
                let _ = worker.join();
                Err(err)
            }
            Err(_) => {
                let _ = worker.join();
                Err(SinkError::RenderThread(
                    "render thread died during setup".into(),
                ))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handoff.running()
    }

    pub fn native_id(&self) -> Option<u64> {
        self.native_id
    }

    pub fn set_crop(&self, crop: CropInsets) {
        *self.crop.lock().unwrap() = crop;
    }

    /// Hands one frame to the thread and blocks until it was drawn and
    /// presented.
    pub fn render(&self, frame: &Frame<'_>) -> Result<(), SinkError> {
        self.handoff.submit(frame)
    }

    /// Signals the thread to stop and joins it. Any in-flight draw finishes
    /// first; teardown of window poller and GL context happens on the
    /// thread before it exits.
    pub fn stop(&mut self) {
        self.handoff.stop();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("render thread panicked during shutdown");
            }
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn map_window_error(err: WindowError) -> SinkError {
    match err {
        WindowError::DisplayUnavailable => SinkError::DisplayUnavailable(err.to_string()),
        other => SinkError::RenderThread(other.to_string()),
    }
}

fn render_loop(
    config: SinkConfig,
    geometry: DisplayGeometry,
    handoff: Arc<Handoff>,
    crop: Arc<Mutex<CropInsets>>,
    setup_tx: mpsc::Sender<SetupResult>,
) {
    // ---- Setting Up ----
    let mut window = match NativeWindow::open(
        &config.title,
        geometry.display_width,
        geometry.display_height,
    ) {
        Ok(w) => w,
        Err(err) => {
            error!(%err, "window setup failed");
            handoff.mark_stopped();
            let _ = setup_tx.send(Err(map_window_error(err)));
            return;
        }
    };

    let mut gles = match unsafe {
        GlesContext::new(
            window.raw_display_handle(),
            window.raw_window_handle(),
            window.size(),
            geometry,
            &config.shader_dir,
        )
    } {
        Ok(c) => c,
        Err(err) => {
            error!(%err, "graphics setup failed");
            window.close();
            handoff.mark_stopped();
            let _ = setup_tx.send(Err(err));
            return;
        }
    };

    let _ = setup_tx.send(Ok(window.native_id()));
    debug!("render thread ready");

    // ---- Ready/Waiting ⇄ Drawing ----
    while let Some(slot) = handoff.wait_frame() {
        let frame = unsafe { slot.as_frame() };
        let crop_now = *crop.lock().unwrap();
        unsafe {
            gles.draw_offscreen(&frame);
            gles.draw_onscreen(window.size(), crop_now);
        }
        gles.present();
        handoff.complete();
    }

    // ---- Stopping → Torn Down ----
    // Poller first, then the GL stack; the window (and its display
    // connection) outlives the surface teardown and drops last.
    window.close();
    unsafe { gles.destroy() };
    drop(window);

    // Release any producer still parked on render-done.
    handoff.complete();
    debug!("render thread torn down");
}
