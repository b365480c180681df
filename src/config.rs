// config.rs - playback tuning loaded from JSON

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoConfig {
    /// Seconds of video the player may buffer ahead.
    pub max_buffer_duration: f64,
    /// Horizontal field of view in degrees.
    pub geometry_field_of_view: f32,
    /// Warn once when a selected camera has not started after this many ms.
    pub pending_camera_warn_ms: Option<u64>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_buffer_duration: 5.0,
            geometry_field_of_view: 105.0,
            pending_camera_warn_ms: None,
        }
    }
}

impl VideoConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::Config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn field_of_view_radians(&self) -> f32 {
        self.geometry_field_of_view.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let config = VideoConfig::from_json(r#"{"geometryFieldOfView": 90}"#).unwrap();
        assert_eq!(config.geometry_field_of_view, 90.0);
        assert_eq!(config.max_buffer_duration, 5.0);
        assert_eq!(config.pending_camera_warn_ms, None);
        assert_eq!(VideoConfig::from_json("{}").unwrap(), VideoConfig::default());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"maxBufferDuration": 2.5, "pendingCameraWarnMs": 4000}}"#).unwrap();
        let config = VideoConfig::load(file.path()).unwrap();
        assert_eq!(config.max_buffer_duration, 2.5);
        assert_eq!(config.pending_camera_warn_ms, Some(4000));
    }

    #[test]
    fn reports_bad_documents_and_missing_files() {
        assert!(matches!(
            VideoConfig::from_json("[1, 2]"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            VideoConfig::load("/definitely/not/here.json"),
            Err(Error::Io { .. })
        ));
    }
}
