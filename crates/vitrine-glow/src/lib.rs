//! vitrine GL backend (glow/GLES2 over a glutin EGL context)
//
// This crate intentionally contains **only** the graphics machinery:
// - load/compile/link the two shader programs
// - manage the plane textures and the offscreen render target (FBO + texture)
// - run the two-pass draw (deinterlace/convert into the FBO, letterboxed
//   scale onto the window surface) and present
//
// It does NOT contain windowing, threads, or the pipeline-facing contract.
#![allow(clippy::missing_safety_doc)]

pub mod context;
pub mod quad;
pub mod shader;
pub mod target;
pub mod texture;

pub use vitrine_core::SinkError;

pub use context::GlesContext;
pub use quad::Quad;
pub use shader::{ProgramKind, ShaderProgram};
pub use target::RenderTarget;
pub use texture::{TextureBinding, TextureSet};
