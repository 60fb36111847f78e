use glow::HasContext;

use vitrine_core::SinkError;

/// Offscreen render target: an FBO with the RGB intermediate texture
/// color-attached.
///
/// The texture itself is owned by the [`crate::TextureSet`]; this type only
/// owns the framebuffer object.
#[derive(Debug)]
pub struct RenderTarget {
    pub fbo: glow::NativeFramebuffer,
    pub width: i32,
    pub height: i32,
}

impl RenderTarget {
    pub unsafe fn new(
        gl: &glow::Context,
        color: glow::NativeTexture,
        width: i32,
        height: i32,
    ) -> Result<Self, SinkError> {
        let fbo = gl
            .create_framebuffer()
            .map_err(|e| SinkError::GlCreate(format!("create_framebuffer failed: {e:?}")))?;

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(color),
            0,
        );

        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.delete_framebuffer(fbo);
            return Err(SinkError::GlCreate(format!(
                "framebuffer incomplete: 0x{status:x}"
            )));
        }

        gl.bind_framebuffer(glow::FRAMEBUFFER, None);

        Ok(Self {
            fbo,
            width: width.max(1),
            height: height.max(1),
        })
    }

    pub unsafe fn bind(&self, gl: &glow::Context) {
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
    }

    pub unsafe fn unbind(gl: &glow::Context) {
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_framebuffer(self.fbo);
    }
}
