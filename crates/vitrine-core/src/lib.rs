#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

//! Backend-agnostic data model for the vitrine video sink.
//!
//! This crate defines what a negotiated video stream *is*: pixel format,
//! plane layout, display geometry, plus the letterbox math and the sink
//! configuration. Backends (GL context, window host, sink adapter) build on
//! these types; nothing in here touches a GPU or a window system.

pub mod config;
pub mod error;
pub mod format;
pub mod geometry;

// ---- Stable re-exports ----
pub use error::SinkError;

pub use config::SinkConfig;
pub use format::{DisplayGeometry, Frame, FrameLayout, Par, PixelFormat, VideoFormat};
pub use geometry::{center_rect, CropInsets, Rect};
