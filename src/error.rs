// error.rs - crate error type

use thiserror::Error;

/// Errors surfaced at the boundary of the core (document loading and input validation).
///
/// The per-frame path never produces these: meshes are generated from fixed constants,
/// gaze misses keep the previous viewport and lookups return sentinels.
#[derive(Debug, Error)]
pub enum Error {
    /// Signaling document could not be decoded.
    #[error("failed to decode signaling document: {0}")]
    Signaling(#[source] serde_json::Error),

    /// Video config document could not be decoded.
    #[error("failed to decode video config: {0}")]
    Config(#[source] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Control room v2 layouts need at least one thumbnail row.
    #[error("control room v2 needs at least one row of thumbnails (got {0})")]
    InvalidRowCount(u32),

    #[error("bitrate must not be negative (got {0})")]
    NegativeBitrate(i64),

    #[error("camera {0} not found in signaling")]
    UnknownCamera(i32),

    #[error("unknown signaling version {0:?}")]
    UnknownSignalingVersion(String),
}

pub type Result<T> = std::result::Result<T, Error>;
