use std::fmt;
use std::path::PathBuf;

/// Sink-level errors used across vitrine crates.
///
/// Contract rule: this type lives in `vitrine-core` and is re-exported by
/// the backend and adapter crates.
#[derive(Debug)]
pub enum SinkError {
    // ---- Negotiation (rejected locally, upstream may retry) ----
    Negotiation(String),

    // ---- Resource acquisition (fatal to the render thread) ----
    DisplayUnavailable(String),
    ConfigSelection(String),
    SurfaceCreate(String),
    ContextCreate(String),
    MakeCurrent(String),
    GlCreate(String),

    // ---- Shader loading / compilation (fatal, aborts setup) ----
    ShaderLoad {
        path: PathBuf,
        source: std::io::Error,
    },
    VertexCompile(String),
    FragmentCompile(String),
    Link(String),

    // ---- Adapter / protocol ----
    RenderThread(String),
    InvalidFrame {
        expected: usize,
        actual: usize,
    },
    ExternalWindowUnsupported,

    // ---- Config / IO ----
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    // ---- Fallback ----
    Other(String),
}

impl SinkError {
    pub fn other<T: Into<String>>(s: T) -> Self {
        SinkError::Other(s.into())
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Negotiation(msg) => write!(f, "format negotiation rejected: {msg}"),

            SinkError::DisplayUnavailable(msg) => write!(f, "display unavailable: {msg}"),
            SinkError::ConfigSelection(msg) => write!(f, "display config selection failed: {msg}"),
            SinkError::SurfaceCreate(msg) => write!(f, "surface creation failed: {msg}"),
            SinkError::ContextCreate(msg) => write!(f, "context creation failed: {msg}"),
            SinkError::MakeCurrent(msg) => write!(f, "make-current failed: {msg}"),
            SinkError::GlCreate(msg) => write!(f, "backend object creation failed: {msg}"),

            SinkError::ShaderLoad { path, source } => {
                write!(f, "shader load failed at {}: {}", path.display(), source)
            }
            SinkError::VertexCompile(log) => write!(f, "vertex shader compile error: {log}"),
            SinkError::FragmentCompile(log) => write!(f, "fragment shader compile error: {log}"),
            SinkError::Link(log) => write!(f, "program link error: {log}"),

            SinkError::RenderThread(msg) => write!(f, "render thread error: {msg}"),
            SinkError::InvalidFrame { expected, actual } => {
                write!(f, "frame buffer length {actual} does not match negotiated layout ({expected} bytes)")
            }
            SinkError::ExternalWindowUnsupported => {
                write!(f, "externally supplied window handles are not supported")
            }

            SinkError::Io { path, source } => {
                write!(f, "io error at {}: {}", path.display(), source)
            }
            SinkError::Json { path, source } => {
                write!(f, "json parse error at {}: {}", path.display(), source)
            }

            SinkError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::ShaderLoad { source, .. } => Some(source),
            SinkError::Io { source, .. } => Some(source),
            SinkError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
