use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::geometry::CropInsets;

fn default_title() -> String {
    "vitrine".to_string()
}

fn default_shader_dir() -> PathBuf {
    PathBuf::from("/usr/share/vitrine/shaders")
}

/// Sink configuration.
///
/// Everything here is plumbing, not algorithm: a verbosity flag, the shader
/// lookup directory, edge crop, and the drop-first-N-frames policy. All
/// fields have defaults so `SinkConfig::default()` yields a working sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Window title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Directory searched for shader binaries/sources (see the glow crate's
    /// loader for the naming convention).
    #[serde(default = "default_shader_dir")]
    pub shader_dir: PathBuf,

    /// Suppress per-frame logging.
    #[serde(default)]
    pub silent: bool,

    /// Edge crop applied by the scale pass.
    #[serde(default)]
    pub crop: CropInsets,

    /// Number of leading frames to drop before anything is displayed.
    #[serde(default)]
    pub drop_first: u32,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            shader_dir: default_shader_dir(),
            silent: false,
            crop: CropInsets::default(),
            drop_first: 0,
        }
    }
}

impl SinkConfig {
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| SinkError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg: SinkConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.title, "vitrine");
        assert!(!cfg.silent);
        assert_eq!(cfg.drop_first, 0);
        assert!(cfg.crop.is_zero());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg: SinkConfig =
            serde_json::from_str(r#"{"drop_first": 3, "crop": {"top": 8}}"#).unwrap();
        assert_eq!(cfg.drop_first, 3);
        assert_eq!(cfg.crop.top, 8);
        assert_eq!(cfg.crop.left, 0);
        assert_eq!(cfg.title, "vitrine");
    }

    #[test]
    fn missing_file_reports_io_error_with_path() {
        let err = SinkConfig::from_json_path("/nonexistent/vitrine.json").unwrap_err();
        assert!(matches!(err, SinkError::Io { .. }));
    }
}
