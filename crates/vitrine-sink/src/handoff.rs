//! Single-slot frame rendezvous between the delivery thread and the render
//! thread.
//!
//! One frame crosses the boundary at a time: the producer deposits a payload
//! under the frame lock, signals frame-ready, and blocks on render-done
//! until the consumer has drawn it. There is no queueing: a second frame
//! cannot be deposited before the first round-trip completes, which is what
//! gives the pipeline its one-frame back-pressure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use vitrine_core::{Frame, FrameLayout, SinkError};

/// The payload crossing the thread boundary: raw pointer + length plus the
/// negotiated layout.
///
/// Soundness: the producer stays parked inside [`Handoff::submit`] until the
/// consumer signals render-done (or until it has reclaimed an untouched
/// deposit), so the pointed-at buffer outlives every consumer access.
#[derive(Debug, Clone, Copy)]
pub struct FrameSlot {
    ptr: *const u8,
    len: usize,
    layout: FrameLayout,
}

unsafe impl Send for FrameSlot {}

impl FrameSlot {
    fn capture(frame: &Frame<'_>) -> Self {
        Self {
            ptr: frame.data.as_ptr(),
            len: frame.data.len(),
            layout: frame.layout,
        }
    }

    /// Rebuilds the borrowed frame view. Consumer side only, and only
    /// between taking the slot and signalling completion.
    pub unsafe fn as_frame<'a>(&self) -> Frame<'a> {
        Frame {
            layout: self.layout,
            data: std::slice::from_raw_parts(self.ptr, self.len),
        }
    }
}

#[derive(Debug)]
pub struct Handoff {
    /// Frame-ready lock: the one slot, plus its condition.
    slot: Mutex<Option<FrameSlot>>,
    frame_ready: Condvar,

    /// Render-done lock: completion flag, plus its condition.
    done: Mutex<bool>,
    render_done: Condvar,

    running: AtomicBool,
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Handoff {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            frame_ready: Condvar::new(),
            done: Mutex::new(false),
            render_done: Condvar::new(),
            running: AtomicBool::new(true),
        }
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Marks the consumer as dead without waking anyone. The consumer uses
    /// this when setup fails before the wait loop is ever entered.
    pub fn mark_stopped(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop signal: clears the running flag and wakes both sides. The empty
    /// slot is the "null payload" the consumer's wait loop interprets as
    /// stop rather than a draw request.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        {
            let _slot = self.slot.lock().unwrap();
            self.frame_ready.notify_all();
        }
        {
            let _done = self.done.lock().unwrap();
            self.render_done.notify_all();
        }
    }

    /// Producer side: deposits `frame` and blocks until the consumer signals
    /// completion.
    ///
    /// The wait is unbounded by design: if the consumer hangs mid-draw (a
    /// wedged GPU driver or display server), so does this call. A stop that
    /// arrives while the deposit is still untouched reclaims it and returns
    /// an error; a stop that arrives mid-draw waits the draw out.
    pub fn submit(&self, frame: &Frame<'_>) -> Result<(), SinkError> {
        if !self.running() {
            return Err(SinkError::RenderThread("render thread is not running".into()));
        }

        {
            let mut slot = self.slot.lock().unwrap();
            *slot = Some(FrameSlot::capture(frame));
            self.frame_ready.notify_one();
        }

        let mut done = self.done.lock().unwrap();
        loop {
            if *done {
                *done = false;
                drop(done);
                // A consumer that exited without taking our deposit also
                // raises the flag; distinguish by whether the slot emptied.
                let mut slot = self.slot.lock().unwrap();
                if slot.take().is_some() {
                    return Err(SinkError::RenderThread(
                        "render thread stopped before the frame was drawn".into(),
                    ));
                }
                return Ok(());
            }

            if !self.running() {
                drop(done);
                let mut slot = self.slot.lock().unwrap();
                if slot.take().is_some() {
                    // Never picked up; safe to reclaim the borrow and bail.
                    return Err(SinkError::RenderThread(
                        "stopped while waiting for the render thread".into(),
                    ));
                }
                drop(slot);
                // The consumer holds the frame: the in-flight draw must
                // finish before the borrow may end.
                done = self.done.lock().unwrap();
                while !*done {
                    done = self.render_done.wait(done).unwrap();
                }
                continue;
            }

            done = self.render_done.wait(done).unwrap();
        }
    }

    /// Consumer side: blocks until a frame is deposited or the stop signal
    /// arrives. Returns `None` on stop.
    pub fn wait_frame(&self) -> Option<FrameSlot> {
        let mut slot = self.slot.lock().unwrap();
        loop {
            // A pending deposit is drawn even if the stop raced in; the
            // producer is still parked waiting for it.
            if let Some(frame) = slot.take() {
                return Some(frame);
            }
            if !self.running() {
                return None;
            }
            slot = self.frame_ready.wait(slot).unwrap();
        }
    }

    /// Consumer side: signals render-done for the frame taken last. Also
    /// used once on consumer exit so a parked producer can never be left
    /// behind.
    pub fn complete(&self) {
        let mut done = self.done.lock().unwrap();
        *done = true;
        self.render_done.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn frame_bytes(layout: FrameLayout, fill: u8) -> Vec<u8> {
        vec![fill; layout.total_len()]
    }

    /// A consumer thread that echoes completion immediately and records the
    /// first byte of every frame it sees.
    fn echo_consumer(handoff: Arc<Handoff>) -> thread::JoinHandle<Vec<u8>> {
        thread::spawn(move || {
            let mut seen = Vec::new();
            while let Some(slot) = handoff.wait_frame() {
                let frame = unsafe { slot.as_frame() };
                seen.push(frame.data[0]);
                handoff.complete();
            }
            handoff.complete();
            seen
        })
    }

    #[test]
    fn frames_round_trip_in_order() {
        let layout = FrameLayout::new(16, 16);
        let handoff = Arc::new(Handoff::new());
        let consumer = echo_consumer(Arc::clone(&handoff));

        for i in 0..32u8 {
            let buf = frame_bytes(layout, i);
            let frame = Frame::new(layout, &buf).unwrap();
            handoff.submit(&frame).unwrap();
        }

        handoff.stop();
        let seen = consumer.join().unwrap();
        assert_eq!(seen, (0..32u8).collect::<Vec<_>>());
    }

    #[test]
    fn submit_after_stop_is_rejected() {
        let layout = FrameLayout::new(16, 16);
        let handoff = Handoff::new();
        handoff.stop();

        let buf = frame_bytes(layout, 1);
        let frame = Frame::new(layout, &buf).unwrap();
        assert!(matches!(
            handoff.submit(&frame),
            Err(SinkError::RenderThread(_))
        ));
    }

    #[test]
    fn stop_unblocks_a_waiting_producer() {
        let layout = FrameLayout::new(16, 16);
        let handoff = Arc::new(Handoff::new());

        // No consumer at all: the deposit is never picked up.
        let stopper = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                handoff.stop();
            })
        };

        let buf = frame_bytes(layout, 7);
        let frame = Frame::new(layout, &buf).unwrap();
        let result = handoff.submit(&frame);
        assert!(result.is_err(), "stop must unblock the producer");
        stopper.join().unwrap();

        // The reclaimed slot must be empty again.
        assert!(handoff.slot.lock().unwrap().is_none());
    }

    #[test]
    fn stop_during_draw_waits_the_draw_out() {
        let layout = FrameLayout::new(16, 16);
        let handoff = Arc::new(Handoff::new());

        let consumer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || {
                let slot = handoff.wait_frame().expect("one frame");
                let _frame = unsafe { slot.as_frame() };
                // Stop arrives while this draw is in flight.
                thread::sleep(Duration::from_millis(100));
                handoff.complete();
            })
        };

        let stopper = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                handoff.stop();
            })
        };

        let buf = frame_bytes(layout, 9);
        let frame = Frame::new(layout, &buf).unwrap();
        // The in-flight draw completes, so this render call still succeeds.
        handoff.submit(&frame).unwrap();

        consumer.join().unwrap();
        stopper.join().unwrap();
    }

    #[test]
    fn double_stop_is_a_no_op() {
        let handoff = Handoff::new();
        handoff.stop();
        handoff.stop();
        assert!(!handoff.running());
    }
}
