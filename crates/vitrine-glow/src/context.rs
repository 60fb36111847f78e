use std::ffi::CString;
use std::num::NonZeroU32;
use std::path::Path;

use glow::HasContext;
use glutin::config::{Api, ConfigSurfaceTypes, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use tracing::{debug, warn};

use vitrine_core::{center_rect, CropInsets, DisplayGeometry, Frame, SinkError};

use crate::quad::Quad;
use crate::shader::{ProgramKind, ShaderProgram};
use crate::target::RenderTarget;
use crate::texture::TextureSet;

/// The GL side of the sink: display connection, window surface, rendering
/// context, the two programs, the texture set, and the offscreen target.
///
/// Thread affinity: the context is made current on the creating thread and
/// every call after `new` must come from that same thread for the lifetime
/// of the value. Nothing here is `Send`.
pub struct GlesContext {
    gl: glow::Context,
    surface: Option<Surface<WindowSurface>>,
    context: Option<PossiblyCurrentContext>,
    // Held for its connection lifetime; EGL displays have no destroy call of
    // their own beyond process teardown.
    _display: Display,

    deinterlace: ShaderProgram,
    scale: ShaderProgram,
    textures: TextureSet,
    target: RenderTarget,
    quad: Quad,

    geometry: DisplayGeometry,
    surface_size: (u32, u32),
    initialized: bool,
}

impl GlesContext {
    /// Builds the full GL stack against an existing native window:
    /// display → config → context → surface → make-current → programs →
    /// textures → FBO.
    ///
    /// Zero matching display configs is fatal; any count other than one is
    /// only worth a warning. All failure paths release whatever GL objects
    /// they had already created.
    pub unsafe fn new(
        raw_display: RawDisplayHandle,
        raw_window: RawWindowHandle,
        surface_size: (u32, u32),
        geometry: DisplayGeometry,
        shader_dir: &Path,
    ) -> Result<Self, SinkError> {
        let display = Display::new(raw_display, DisplayApiPreference::Egl)
            .map_err(|e| SinkError::DisplayUnavailable(format!("{e}")))?;

        let template = ConfigTemplateBuilder::new()
            .with_api(Api::GLES2)
            .with_surface_type(ConfigSurfaceTypes::WINDOW)
            .with_depth_size(16)
            .compatible_with_native_window(raw_window)
            .build();

        let configs: Vec<_> = display
            .find_configs(template)
            .map_err(|e| SinkError::ConfigSelection(format!("find_configs: {e}")))?
            .collect();
        if configs.is_empty() {
            return Err(SinkError::ConfigSelection(
                "no display config matches a GLES2 window surface with 16-bit depth".into(),
            ));
        }
        if configs.len() != 1 {
            warn!(
                count = configs.len(),
                "did not get exactly one display config, using the first"
            );
        }
        let config = configs.into_iter().next().expect("checked non-empty");

        let context_attrs = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(Version::new(2, 0))))
            .build(Some(raw_window));
        let not_current = display
            .create_context(&config, &context_attrs)
            .map_err(|e| SinkError::ContextCreate(format!("{e}")))?;

        let (w, h) = surface_size;
        let surface_attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window,
            NonZeroU32::new(w.max(1)).expect("clamped to >= 1"),
            NonZeroU32::new(h.max(1)).expect("clamped to >= 1"),
        );
        let surface = display
            .create_window_surface(&config, &surface_attrs)
            .map_err(|e| SinkError::SurfaceCreate(format!("{e}")))?;

        let context = not_current
            .make_current(&surface)
            .map_err(|e| SinkError::MakeCurrent(format!("{e}")))?;

        let gl = glow::Context::from_loader_function(|s| {
            let s = CString::new(s).expect("proc name contains no NUL");
            display.get_proc_address(s.as_c_str()) as *const _
        });

        let mut deinterlace = ShaderProgram::load(&gl, shader_dir, ProgramKind::Deinterlace)?;
        let mut scale = match ShaderProgram::load(&gl, shader_dir, ProgramKind::Scale) {
            Ok(p) => p,
            Err(err) => {
                deinterlace.destroy(&gl);
                return Err(err);
            }
        };

        let dw = geometry.display_width as i32;
        let dh = geometry.display_height as i32;
        let mut textures = match TextureSet::new(&gl, &deinterlace, &scale, dw, dh) {
            Ok(t) => t,
            Err(err) => {
                deinterlace.destroy(&gl);
                scale.destroy(&gl);
                return Err(err);
            }
        };

        let target = match RenderTarget::new(&gl, textures.rgb.tex, dw, dh) {
            Ok(t) => t,
            Err(err) => {
                textures.destroy(&gl);
                deinterlace.destroy(&gl);
                scale.destroy(&gl);
                return Err(err);
            }
        };

        let quad = match Quad::new(&gl) {
            Ok(q) => q,
            Err(err) => {
                let mut target = target;
                target.destroy(&gl);
                textures.destroy(&gl);
                deinterlace.destroy(&gl);
                scale.destroy(&gl);
                return Err(err);
            }
        };

        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.disable(glow::DEPTH_TEST);

        debug!(
            display_width = geometry.display_width,
            display_height = geometry.display_height,
            "graphics context ready"
        );

        Ok(Self {
            gl,
            surface: Some(surface),
            context: Some(context),
            _display: display,
            deinterlace,
            scale,
            textures,
            target,
            quad,
            geometry,
            surface_size: (w.max(1), h.max(1)),
            initialized: true,
        })
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    /// Pass 1: deinterlace/convert the frame's planes into the offscreen
    /// target at the display geometry.
    pub unsafe fn draw_offscreen(&mut self, frame: &Frame<'_>) {
        if !self.initialized {
            return;
        }

        self.target.bind(&self.gl);
        self.gl.viewport(0, 0, self.target.width, self.target.height);
        self.gl.clear(glow::COLOR_BUFFER_BIT);

        self.gl.use_program(Some(self.deinterlace.program));
        self.textures.upload_planes(&self.gl, frame);

        // The deinterlace algorithm samples adjacent lines; it needs to know
        // how far apart they are in texture space.
        let line_height = 1.0 / self.geometry.display_height.max(1) as f32;
        let loc = self.deinterlace.uniform_location(&self.gl, "line_height");
        self.gl.uniform_1_f32(loc.as_ref(), line_height);

        self.quad
            .draw(&self.gl, &self.deinterlace, (0.0, 0.0, 1.0, 1.0), false);

        RenderTarget::unbind(&self.gl);
        self.log_gl_errors("offscreen pass");
    }

    /// Pass 2: letterbox the intermediate texture into the window and
    /// present.
    ///
    /// `window_size` is the poller's current width/height; `crop` shrinks
    /// the sampled region edge-wise.
    pub unsafe fn draw_onscreen(&mut self, window_size: (u32, u32), crop: CropInsets) {
        if !self.initialized {
            return;
        }

        let (win_w, win_h) = (window_size.0.max(1), window_size.1.max(1));
        if (win_w, win_h) != self.surface_size {
            if let (Some(surface), Some(context)) = (&self.surface, &self.context) {
                surface.resize(
                    context,
                    NonZeroU32::new(win_w).expect("clamped to >= 1"),
                    NonZeroU32::new(win_h).expect("clamped to >= 1"),
                );
            }
            self.surface_size = (win_w, win_h);
        }

        RenderTarget::unbind(&self.gl);

        // Clear the whole window first so the letterbox bars stay black.
        self.gl.viewport(0, 0, win_w as i32, win_h as i32);
        self.gl.clear(glow::COLOR_BUFFER_BIT);

        let rect = center_rect(
            self.geometry.display_width,
            self.geometry.display_height,
            win_w,
            win_h,
        );
        self.gl.viewport(rect.x, rect.y, rect.width, rect.height);

        self.gl.use_program(Some(self.scale.program));
        self.gl.active_texture(glow::TEXTURE0);
        self.gl.bind_texture(glow::TEXTURE_2D, Some(self.textures.rgb.tex));
        self.gl
            .uniform_1_i32(self.textures.rgb.location.as_ref(), 0);

        let uv = crop.uv_rect(self.geometry.display_width, self.geometry.display_height);
        self.quad.draw(&self.gl, &self.scale, uv, true);

        self.log_gl_errors("onscreen pass");
    }

    /// Presents via buffer swap. Failures are logged, not fatal: a missed
    /// present shows one stale frame, which beats stalling the pipeline.
    pub fn present(&self) {
        if let (Some(surface), Some(context)) = (&self.surface, &self.context) {
            if let Err(err) = surface.swap_buffers(context) {
                warn!(%err, "buffer swap failed");
            }
        }
    }

    /// Releases all GL objects, then surface and context. Repeated calls are
    /// no-ops: the initialized flag gates the GL deletes and the surface and
    /// context slots empty on first release.
    pub unsafe fn destroy(&mut self) {
        if self.initialized {
            self.textures.destroy(&self.gl);
            self.target.destroy(&self.gl);
            self.quad.destroy(&self.gl);
            self.deinterlace.destroy(&self.gl);
            self.scale.destroy(&self.gl);
        }
        drop(self.surface.take());
        drop(self.context.take());
        self.initialized = false;
    }

    unsafe fn log_gl_errors(&self, stage: &str) {
        loop {
            let code = self.gl.get_error();
            if code == glow::NO_ERROR {
                break;
            }
            // Not fatal: present whatever was drawn rather than stall.
            warn!(stage, code = format_args!("0x{code:x}"), "GL error reported");
        }
    }
}

impl Drop for GlesContext {
    fn drop(&mut self) {
        unsafe { self.destroy() }
    }
}

impl std::fmt::Debug for GlesContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // GL and display handles carry no useful Debug of their own.
        f.debug_struct("GlesContext")
            .field("geometry", &self.geometry)
            .field("surface_size", &self.surface_size)
            .field("initialized", &self.initialized)
            .finish()
    }
}
