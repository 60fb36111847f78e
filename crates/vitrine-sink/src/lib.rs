//! vitrine sink: the producer/consumer rendering engine.
//!
//! Three threads cooperate here: the pipeline delivery thread drives the
//! [`VideoSink`] contract, the render thread owns all GL state, and the
//! window host's polling thread owns the event queue. One frame at a time
//! crosses from delivery to render through the single-slot [`handoff`]
//! rendezvous, giving one-frame back-pressure with no internal queueing.

pub mod handoff;
pub mod sink;
pub mod thread;

pub use vitrine_core::SinkError;

pub use handoff::{FrameSlot, Handoff};
pub use sink::{GlesSink, VideoSink, WindowHandleCallback};
pub use thread::RenderThread;
