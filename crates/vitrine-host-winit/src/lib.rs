//! Native window host for the vitrine sink.
//!
//! Owns the display connection and the on-screen window, and runs the event
//! pump on its own thread at a fixed poll interval. The stored width/height
//! is the only data shared with the render thread; it is updated under the
//! window lock from resize events and read by the scale pass's letterbox
//! computation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use raw_window_handle::{
    HasRawDisplayHandle, HasRawWindowHandle, RawDisplayHandle, RawWindowHandle,
};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::window::WindowBuilder;

/// Fixed delay between event-pump iterations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(thiserror::Error, Debug)]
pub enum WindowError {
    #[error("no display connection available (neither WAYLAND_DISPLAY nor DISPLAY is set)")]
    DisplayUnavailable,

    #[error("window creation failed: {0}")]
    Create(String),

    #[error("window thread exited before the window was created")]
    ThreadExited,
}

/// The native window plus its polling thread.
///
/// Created on (and owned by) the render thread; the polling thread only
/// drains the event queue and maintains the shared size.
#[derive(Debug)]
pub struct NativeWindow {
    window: Arc<winit::window::Window>,
    size: Arc<Mutex<(u32, u32)>>,
    running: Arc<AtomicBool>,
    poller: Option<thread::JoinHandle<()>>,
}

impl NativeWindow {
    /// Opens the display connection, creates and maps a `width`×`height`
    /// window with `title`, and starts the polling thread.
    ///
    /// The event loop is thread-affine, so the window is created *on* the
    /// polling thread and handed back; this call blocks until that happened.
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self, WindowError> {
        if !display_available() {
            return Err(WindowError::DisplayUnavailable);
        }

        let size = Arc::new(Mutex::new((width.max(1), height.max(1))));
        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel();

        let title = title.to_string();
        let size_for_thread = Arc::clone(&size);
        let running_for_thread = Arc::clone(&running);

        let poller = thread::Builder::new()
            .name("vitrine-window".into())
            .spawn(move || {
                poll_loop(title, width, height, size_for_thread, running_for_thread, tx)
            })
            .map_err(|e| WindowError::Create(format!("spawn poller: {e}")))?;

        match rx.recv() {
            Ok(Ok(window)) => {
                debug!(width, height, "native window mapped");
                Ok(Self {
                    window,
                    size,
                    running,
                    poller: Some(poller),
                })
            }
            Ok(Err(err)) => {
                let _ = poller.join();
                Err(err)
            }
            Err(_) => {
                let _ = poller.join();
                Err(WindowError::ThreadExited)
            }
        }
    }

    /// Current window size as maintained by the polling thread.
    pub fn size(&self) -> (u32, u32) {
        *self.size.lock().unwrap()
    }

    pub fn raw_display_handle(&self) -> RawDisplayHandle {
        self.window.raw_display_handle()
    }

    pub fn raw_window_handle(&self) -> RawWindowHandle {
        self.window.raw_window_handle()
    }

    /// Platform window id suitable for announcing to an embedding
    /// application, when the platform has a meaningful one.
    pub fn native_id(&self) -> Option<u64> {
        match self.window.raw_window_handle() {
            RawWindowHandle::Xlib(h) => Some(h.window as u64),
            RawWindowHandle::Xcb(h) => Some(h.window as u64),
            _ => None,
        }
    }

    /// Stops and joins the polling thread. The window itself (and with it
    /// the display connection) stays alive until this value is dropped, so
    /// a GL surface built on it can still be torn down afterwards.
    ///
    /// Safe to call repeatedly or when the poller already exited.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.poller.take() {
            if handle.join().is_err() {
                warn!("window poller panicked during shutdown");
            }
        }
    }
}

impl Drop for NativeWindow {
    fn drop(&mut self) {
        self.close();
    }
}

fn display_available() -> bool {
    if cfg!(target_os = "linux") {
        std::env::var_os("WAYLAND_DISPLAY").is_some() || std::env::var_os("DISPLAY").is_some()
    } else {
        true
    }
}

type WindowResult = Result<Arc<winit::window::Window>, WindowError>;

/// Body of the polling thread: build the event loop and window, hand the
/// window back, then drain events every [`POLL_INTERVAL`] until told to
/// stop. Resize events are folded into the shared size under its lock.
fn poll_loop(
    title: String,
    width: u32,
    height: u32,
    size: Arc<Mutex<(u32, u32)>>,
    running: Arc<AtomicBool>,
    created: mpsc::Sender<WindowResult>,
) {
    let mut builder = EventLoopBuilder::new();
    #[cfg(target_os = "linux")]
    {
        winit::platform::x11::EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
        winit::platform::wayland::EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }
    let mut event_loop = builder.build();

    let window = match WindowBuilder::new()
        .with_title(&title)
        .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
    {
        Ok(w) => Arc::new(w),
        Err(e) => {
            let _ = created.send(Err(WindowError::Create(e.to_string())));
            return;
        }
    };

    if created.send(Ok(Arc::clone(&window))).is_err() {
        // Creator gave up waiting; nothing left to poll for.
        return;
    }

    use winit::platform::run_return::EventLoopExtRunReturn;
    while running.load(Ordering::SeqCst) {
        event_loop.run_return(|event, _, control_flow| {
            // Drain whatever is pending, then fall out of the pump.
            *control_flow = ControlFlow::Exit;

            if let Event::WindowEvent {
                event: WindowEvent::Resized(new_size),
                ..
            } = event
            {
                let mut size = size.lock().unwrap();
                *size = (new_size.width.max(1), new_size.height.max(1));
            }
        });
        thread::sleep(POLL_INTERVAL);
    }

    debug!("window poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_their_cause() {
        assert!(WindowError::DisplayUnavailable.to_string().contains("DISPLAY"));
        assert!(WindowError::Create("boom".into())
            .to_string()
            .contains("boom"));
    }

    #[test]
    fn poll_interval_is_a_tenth_of_a_second() {
        assert_eq!(POLL_INTERVAL, Duration::from_millis(100));
    }
}
