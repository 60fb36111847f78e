use glow::HasContext;

use vitrine_core::SinkError;

use crate::shader::ShaderProgram;

/// A two-triangle quad covering full clip space, with per-draw texture
/// coordinates (crop shrinks them, the on-screen pass flips them).
///
/// GLES2 has no vertex array objects, so the attribute pointers are set up
/// on every draw against the bound VBO.
#[derive(Debug)]
pub struct Quad {
    vbo: glow::NativeBuffer,
}

const STRIDE: i32 = 4 * 4; // x, y, u, v as f32

impl Quad {
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, SinkError> {
        let vbo = gl
            .create_buffer()
            .map_err(|e| SinkError::GlCreate(format!("create_buffer failed: {e:?}")))?;
        Ok(Self { vbo })
    }

    /// Draws the quad sampling `(u0, v0, u1, v1)`.
    ///
    /// `flip_v` orients the texture coordinates for the on-screen pass:
    /// the FBO texture and the window disagree on vertical origin.
    pub unsafe fn draw(
        &self,
        gl: &glow::Context,
        program: &ShaderProgram,
        uv: (f32, f32, f32, f32),
        flip_v: bool,
    ) {
        let (u0, v0, u1, v1) = uv;
        // Mirroring (rather than swapping) keeps edge insets on the edge
        // they name after the flip.
        let (v_top, v_bottom) = if flip_v {
            (1.0 - v0, 1.0 - v1)
        } else {
            (v0, v1)
        };

        let verts: [f32; 24] = [
            -1.0, -1.0, u0, v_bottom, //
            1.0, -1.0, u1, v_bottom, //
            1.0, 1.0, u1, v_top, //
            -1.0, -1.0, u0, v_bottom, //
            1.0, 1.0, u1, v_top, //
            -1.0, 1.0, u0, v_top,
        ];
        let bytes = core::slice::from_raw_parts(
            verts.as_ptr() as *const u8,
            verts.len() * core::mem::size_of::<f32>(),
        );

        gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, glow::STREAM_DRAW);

        if let Some(pos) = program.position_loc {
            gl.enable_vertex_attrib_array(pos);
            gl.vertex_attrib_pointer_f32(pos, 2, glow::FLOAT, false, STRIDE, 0);
        }
        if let Some(tc) = program.texcoord_loc {
            gl.enable_vertex_attrib_array(tc);
            gl.vertex_attrib_pointer_f32(tc, 2, glow::FLOAT, false, STRIDE, 2 * 4);
        }

        gl.draw_arrays(glow::TRIANGLES, 0, 6);

        if let Some(pos) = program.position_loc {
            gl.disable_vertex_attrib_array(pos);
        }
        if let Some(tc) = program.texcoord_loc {
            gl.disable_vertex_attrib_array(tc);
        }
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
    }

    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_buffer(self.vbo);
    }
}
