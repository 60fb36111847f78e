use std::path::{Path, PathBuf};

use glow::HasContext;
use tracing::debug;

use vitrine_core::SinkError;

/// Extension of precompiled shader blobs.
pub const SHADER_EXT_BINARY: &str = ".glsh";
/// Extension of portable shader source text.
pub const SHADER_EXT_SOURCE: &str = ".glsl";

/// All programs share one vertex stage under this basename.
pub const VERTEX_BASENAME: &str = "vertex";

const ATTRIB_POSITION: &str = "vPosition";
const ATTRIB_TEXCOORD: &str = "aTexcoord";

/// The two programs the sink runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    /// Pass 1: deinterlace + YUV→RGB into the offscreen target.
    Deinterlace,
    /// Pass 2: scale/copy of the intermediate texture onto the window.
    Scale,
}

impl ProgramKind {
    pub fn fragment_basename(self) -> &'static str {
        match self {
            ProgramKind::Deinterlace => "deint_linear",
            ProgramKind::Scale => "copy",
        }
    }

    fn fallback_fragment(self) -> &'static str {
        match self {
            ProgramKind::Deinterlace => DEINT_LINEAR_FRAG,
            ProgramKind::Scale => COPY_FRAG,
        }
    }
}

/// Candidate files for one shader stage: binary first, source second.
pub fn stage_paths(dir: &Path, basename: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{basename}{SHADER_EXT_BINARY}")),
        dir.join(format!("{basename}{SHADER_EXT_SOURCE}")),
    )
}

/// A linked program plus the stage objects it was built from and the
/// attribute locations every draw needs.
///
/// Stage handles are kept alive so teardown can release vertex shader,
/// fragment shader, and program in one call. A missing attribute location is
/// legal (the scale shader has no use for some names) and is simply `None`.
#[derive(Debug)]
pub struct ShaderProgram {
    pub vertex_shader: glow::NativeShader,
    pub fragment_shader: glow::NativeShader,
    pub program: glow::NativeProgram,
    pub position_loc: Option<u32>,
    pub texcoord_loc: Option<u32>,
}

impl ShaderProgram {
    /// Loads both stages from `shader_dir` (binary blob first, source text
    /// second, embedded default last) and links them.
    pub unsafe fn load(
        gl: &glow::Context,
        shader_dir: &Path,
        kind: ProgramKind,
    ) -> Result<Self, SinkError> {
        let vs = load_stage(gl, shader_dir, VERTEX_BASENAME, glow::VERTEX_SHADER, VERT)?;
        let fs = match load_stage(
            gl,
            shader_dir,
            kind.fragment_basename(),
            glow::FRAGMENT_SHADER,
            kind.fallback_fragment(),
        ) {
            Ok(fs) => fs,
            Err(err) => {
                gl.delete_shader(vs);
                return Err(err);
            }
        };
        link(gl, vs, fs)
    }

    /// Compiles and links directly from source, bypassing the directory
    /// lookup.
    pub unsafe fn from_sources(
        gl: &glow::Context,
        vert_src: &str,
        frag_src: &str,
    ) -> Result<Self, SinkError> {
        let vs = compile_stage(gl, vert_src, glow::VERTEX_SHADER)?;
        let fs = match compile_stage(gl, frag_src, glow::FRAGMENT_SHADER) {
            Ok(fs) => fs,
            Err(err) => {
                gl.delete_shader(vs);
                return Err(err);
            }
        };
        link(gl, vs, fs)
    }

    pub unsafe fn uniform_location(
        &self,
        gl: &glow::Context,
        name: &str,
    ) -> Option<glow::UniformLocation> {
        gl.get_uniform_location(self.program, name)
    }

    /// Releases vertex shader, fragment shader, and program. The owning
    /// context's initialized flag keeps this from running twice.
    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        gl.delete_shader(self.vertex_shader);
        gl.delete_shader(self.fragment_shader);
        gl.delete_program(self.program);
    }
}

unsafe fn load_stage(
    gl: &glow::Context,
    dir: &Path,
    basename: &str,
    stage: u32,
    fallback_src: &str,
) -> Result<glow::NativeShader, SinkError> {
    let (binary_path, source_path) = stage_paths(dir, basename);

    if let Ok(blob) = std::fs::read(&binary_path) {
        match upload_binary(gl, &blob) {
            Ok(shader) => {
                debug!(path = %binary_path.display(), "loaded precompiled shader");
                return Ok(shader);
            }
            Err(reason) => {
                debug!(
                    path = %binary_path.display(),
                    reason,
                    "binary shader rejected, falling back to source"
                );
            }
        }
    }

    let src = match std::fs::read_to_string(&source_path) {
        Ok(src) => src,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %source_path.display(), "no shader file, using built-in source");
            fallback_src.to_string()
        }
        Err(source) => {
            return Err(SinkError::ShaderLoad {
                path: source_path,
                source,
            })
        }
    };

    compile_stage(gl, &src, stage)
}

/// Attempts to ingest a precompiled shader blob.
///
/// glow wraps no `glShaderBinary` entry point; platform blobs are only
/// loadable through vendor extensions this backend does not carry, so the
/// blob is always reported as rejected and the caller falls back to source.
unsafe fn upload_binary(gl: &glow::Context, blob: &[u8]) -> Result<glow::NativeShader, String> {
    let formats = gl.get_parameter_i32(glow::NUM_SHADER_BINARY_FORMATS);
    if formats == 0 {
        return Err("backend reports no shader binary formats".to_string());
    }
    let _ = blob;
    Err(format!(
        "no loadable format among {formats} reported binary formats"
    ))
}

unsafe fn compile_stage(
    gl: &glow::Context,
    src: &str,
    stage: u32,
) -> Result<glow::NativeShader, SinkError> {
    let shader = gl
        .create_shader(stage)
        .map_err(|e| SinkError::GlCreate(format!("create_shader failed: {e:?}")))?;
    gl.shader_source(shader, src);
    gl.compile_shader(shader);
    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(if stage == glow::VERTEX_SHADER {
            SinkError::VertexCompile(log)
        } else {
            SinkError::FragmentCompile(log)
        });
    }
    Ok(shader)
}

unsafe fn link(
    gl: &glow::Context,
    vs: glow::NativeShader,
    fs: glow::NativeShader,
) -> Result<ShaderProgram, SinkError> {
    let program = match gl.create_program() {
        Ok(p) => p,
        Err(e) => {
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(SinkError::GlCreate(format!("create_program failed: {e:?}")));
        }
    };
    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);

    // Index 0 must land on the position attribute; required by at least one
    // shader, harmless for the rest.
    gl.bind_attrib_location(program, 0, ATTRIB_POSITION);

    gl.link_program(program);
    if !gl.get_program_link_status(program) {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        return Err(SinkError::Link(log));
    }

    gl.use_program(Some(program));
    let position_loc = gl.get_attrib_location(program, ATTRIB_POSITION);
    let texcoord_loc = gl.get_attrib_location(program, ATTRIB_TEXCOORD);

    Ok(ShaderProgram {
        vertex_shader: vs,
        fragment_shader: fs,
        program,
        position_loc,
        texcoord_loc,
    })
}

// -------------------------------------------------------------------------------------------------
// Built-in GLSL ES 100 sources, used when the shader directory provides no
// file for a stage. Disk files always win so the sampling algorithm stays a
// swappable policy.
// -------------------------------------------------------------------------------------------------

pub const VERT: &str = r#"attribute vec2 vPosition;
attribute vec2 aTexcoord;
varying vec2 v_texcoord;
void main() {
    gl_Position = vec4(vPosition, 0.0, 1.0);
    v_texcoord = aTexcoord;
}
"#;

pub const DEINT_LINEAR_FRAG: &str = r#"precision mediump float;
varying vec2 v_texcoord;
uniform sampler2D s_ytex;
uniform sampler2D s_utex;
uniform sampler2D s_vtex;
uniform float line_height;

void main() {
    float y0 = texture2D(s_ytex, v_texcoord).r;
    float y1 = texture2D(s_ytex, vec2(v_texcoord.x, v_texcoord.y + line_height)).r;
    float y = 1.164 * (mix(y0, y1, 0.5) - 0.0625);
    float u = texture2D(s_utex, v_texcoord).r - 0.5;
    float v = texture2D(s_vtex, v_texcoord).r - 0.5;
    gl_FragColor = vec4(
        y + 1.596 * v,
        y - 0.391 * u - 0.813 * v,
        y + 2.018 * u,
        1.0);
}
"#;

pub const COPY_FRAG: &str = r#"precision mediump float;
varying vec2 v_texcoord;
uniform sampler2D s_tex;

void main() {
    gl_FragColor = texture2D(s_tex, v_texcoord);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_paths_probe_binary_then_source() {
        let dir = Path::new("/usr/share/vitrine/shaders");
        let (bin, src) = stage_paths(dir, "deint_linear");
        assert_eq!(bin, dir.join("deint_linear.glsh"));
        assert_eq!(src, dir.join("deint_linear.glsl"));
    }

    #[test]
    fn fragment_basenames_are_distinct_per_program() {
        assert_eq!(ProgramKind::Deinterlace.fragment_basename(), "deint_linear");
        assert_eq!(ProgramKind::Scale.fragment_basename(), "copy");
    }

    #[test]
    fn builtin_sources_declare_expected_interface() {
        for frag in [DEINT_LINEAR_FRAG, COPY_FRAG] {
            assert!(frag.contains("v_texcoord"));
        }
        assert!(VERT.contains("vPosition"));
        assert!(VERT.contains("aTexcoord"));
        assert!(DEINT_LINEAR_FRAG.contains("line_height"));
        for sampler in ["s_ytex", "s_utex", "s_vtex"] {
            assert!(DEINT_LINEAR_FRAG.contains(sampler));
        }
        assert!(COPY_FRAG.contains("s_tex"));
    }
}
