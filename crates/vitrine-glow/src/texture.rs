use glow::HasContext;

use vitrine_core::{Frame, SinkError};

use crate::shader::ShaderProgram;

/// One GPU texture paired with the sampler uniform it feeds.
///
/// Created once per context lifetime; only the pixel contents change after
/// that (re-uploaded every frame for the planes, written by the offscreen
/// draw for the intermediate).
#[derive(Debug)]
pub struct TextureBinding {
    pub tex: glow::NativeTexture,
    pub location: Option<glow::UniformLocation>,
}

/// The three YUV plane textures plus the RGB intermediate.
///
/// Planes sample NEAREST (they are read 1:1 by the offscreen pass); the
/// intermediate samples LINEAR because the scale pass is the one that
/// actually resizes.
#[derive(Debug)]
pub struct TextureSet {
    pub y: TextureBinding,
    pub u: TextureBinding,
    pub v: TextureBinding,
    pub rgb: TextureBinding,
}

impl TextureSet {
    /// Creates all four textures and resolves their sampler locations:
    /// plane samplers against the deinterlace program, the intermediate
    /// sampler against the scale program. The intermediate is allocated at
    /// the display geometry up front so the FBO can attach it.
    pub unsafe fn new(
        gl: &glow::Context,
        deinterlace: &ShaderProgram,
        scale: &ShaderProgram,
        display_width: i32,
        display_height: i32,
    ) -> Result<Self, SinkError> {
        let mut created: Vec<glow::NativeTexture> = Vec::with_capacity(4);
        let mut make = |filter: u32| -> Result<glow::NativeTexture, SinkError> {
            match create_texture(gl, filter) {
                Ok(tex) => {
                    created.push(tex);
                    Ok(tex)
                }
                Err(err) => {
                    for tex in created.drain(..) {
                        gl.delete_texture(tex);
                    }
                    Err(err)
                }
            }
        };

        let y_tex = make(glow::NEAREST)?;
        let u_tex = make(glow::NEAREST)?;
        let v_tex = make(glow::NEAREST)?;
        let rgb_tex = make(glow::LINEAR)?;

        gl.bind_texture(glow::TEXTURE_2D, Some(rgb_tex));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA as i32,
            display_width.max(1),
            display_height.max(1),
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            None,
        );
        gl.bind_texture(glow::TEXTURE_2D, None);

        Ok(Self {
            y: TextureBinding {
                tex: y_tex,
                location: deinterlace.uniform_location(gl, "s_ytex"),
            },
            u: TextureBinding {
                tex: u_tex,
                location: deinterlace.uniform_location(gl, "s_utex"),
            },
            v: TextureBinding {
                tex: v_tex,
                location: deinterlace.uniform_location(gl, "s_vtex"),
            },
            rgb: TextureBinding {
                tex: rgb_tex,
                location: scale.uniform_location(gl, "s_tex"),
            },
        })
    }

    /// Uploads the three planes of `frame` and wires their sampler units.
    /// The deinterlace program must be current.
    pub unsafe fn upload_planes(&self, gl: &glow::Context, frame: &Frame<'_>) {
        let layout = frame.layout;

        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.y.tex));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::LUMINANCE as i32,
            layout.width as i32,
            layout.height as i32,
            0,
            glow::LUMINANCE,
            glow::UNSIGNED_BYTE,
            Some(frame.y_plane()),
        );
        gl.uniform_1_i32(self.y.location.as_ref(), 0);

        gl.active_texture(glow::TEXTURE1);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.u.tex));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::LUMINANCE as i32,
            layout.chroma_width as i32,
            layout.chroma_height as i32,
            0,
            glow::LUMINANCE,
            glow::UNSIGNED_BYTE,
            Some(frame.u_plane()),
        );
        gl.uniform_1_i32(self.u.location.as_ref(), 1);

        gl.active_texture(glow::TEXTURE2);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.v.tex));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::LUMINANCE as i32,
            layout.chroma_width as i32,
            layout.chroma_height as i32,
            0,
            glow::LUMINANCE,
            glow::UNSIGNED_BYTE,
            Some(frame.v_plane()),
        );
        gl.uniform_1_i32(self.v.location.as_ref(), 2);
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_texture(self.y.tex);
        gl.delete_texture(self.u.tex);
        gl.delete_texture(self.v.tex);
        gl.delete_texture(self.rgb.tex);
    }
}

/// Plane sizes are not powers of two, so GLES2 requires CLAMP_TO_EDGE and no
/// mipmap filtering.
unsafe fn create_texture(gl: &glow::Context, filter: u32) -> Result<glow::NativeTexture, SinkError> {
    let tex = gl
        .create_texture()
        .map_err(|e| SinkError::GlCreate(format!("create_texture failed: {e:?}")))?;
    gl.bind_texture(glow::TEXTURE_2D, Some(tex));
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter as i32);
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_WRAP_S,
        glow::CLAMP_TO_EDGE as i32,
    );
    gl.tex_parameter_i32(
        glow::TEXTURE_2D,
        glow::TEXTURE_WRAP_T,
        glow::CLAMP_TO_EDGE as i32,
    );
    gl.bind_texture(glow::TEXTURE_2D, None);
    Ok(tex)
}
