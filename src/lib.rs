//! Geometry, camera selection and orientation core of a multi-camera VR video player.
//!
//! Everything here is pure CPU-side state: the binary owns the window and the GPU
//! and feeds input into a [`Controller`], which hands back per-draw matrices once
//! per frame.

pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod gaze;
pub mod layout;
pub mod mesh;
pub mod orientation;
pub mod scene;
pub mod selection;
pub mod signaling;

pub use camera::Camera;
pub use config::VideoConfig;
pub use controller::{Controller, FrameOutput, Input};
pub use error::{Error, Result};
pub use mesh::{GeometryKind, Mesh, Vertex};
pub use scene::{DrawRange, GeometrySet, SignalingVersion};
pub use selection::ViewportChange;
pub use signaling::Signaling;
