// camera.rs - camera records built from signaling documents

use std::f64::consts::PI;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::gaze::{ViewportMap, VIEWPORT_MAP_16, VIEWPORT_MAP_SINGLE};
use crate::layout::{ControlRoomV2Layout, MosaicLayout};
use crate::mesh::GeometryKind;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Representation {
    pub bandwidth: i64,
    pub stream: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewportV3 {
    pub representations: Vec<Representation>,
}

/// Bitrate-ranked representations per viewport (V3 signaling).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewportMatrix {
    pub viewports: Vec<ViewportV3>,
    /// 0 = single viewport, 1 = quad, anything else = 16-way.
    #[serde(rename = "type")]
    pub kind: i32,
}

impl ViewportMatrix {
    pub fn viewport_count(&self) -> usize {
        match self.kind {
            0 => 1,
            1 => 4,
            _ => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRoomType {
    V1,
    V2,
}

impl ControlRoomType {
    pub fn mosaic_layout(self, v2: ControlRoomV2Layout) -> MosaicLayout {
        match self {
            Self::V1 => MosaicLayout::V1,
            Self::V2 => MosaicLayout::V2(v2),
        }
    }
}

/// A playable camera. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: String,
    pub id: i32,
    /// Geometry ids in signaling order. Empty means "no geometry".
    pub geometries: Vec<String>,
    pub viewport_offset: Option<String>,
    pub hls_name: Option<String>,
    pub comment: Option<String>,
    pub base_url: Option<String>,
    pub viewport_matrix: Option<ViewportMatrix>,
    pub is_v3: bool,
}

/// Splits a geometry CSV. An empty or missing list yields no ids.
pub fn parse_geometry_list(csv: Option<&str>) -> Vec<String> {
    csv.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect()
}

impl Camera {
    pub fn new(name: impl Into<String>, id: i32, geometries: &str) -> Self {
        Self {
            name: name.into(),
            id,
            geometries: parse_geometry_list(Some(geometries)),
            viewport_offset: Some("0".to_owned()),
            hls_name: Some(String::new()),
            comment: None,
            base_url: None,
            viewport_matrix: None,
            is_v3: false,
        }
    }

    /// Stand-in for streams played without a signaling document.
    pub fn empty() -> Self {
        Self::new(" ", 0, "")
    }

    /// No-signaling stream forced onto the sphere.
    pub fn ns_equirectangular_mono() -> Self {
        Self::new(" ", 0, GeometryKind::SPHERE_ID)
    }

    /// No-signaling stream forced onto the flat panel.
    pub fn ns_flat_mono() -> Self {
        Self::new(" ", 0, GeometryKind::FLAT_PANEL_ID)
    }

    pub fn has_geometry(&self, id: &str) -> bool {
        self.geometries.iter().any(|g| g == id)
    }

    fn has_any(&self, ids: &[&str]) -> bool {
        ids.iter().any(|id| self.has_geometry(id))
    }

    pub fn is_control_room(&self) -> bool {
        self.has_any(&[
            GeometryKind::CONTROL_ROOM_V1_ID,
            GeometryKind::CONTROL_ROOM_V2_ID,
        ])
    }

    pub fn is_flat_camera(&self) -> bool {
        self.has_any(&[
            GeometryKind::CONTROL_ROOM_V1_ID,
            GeometryKind::FLAT_PANEL_ID,
            GeometryKind::CONTROL_ROOM_V2_ID,
        ])
    }

    pub fn is_360(&self) -> bool {
        self.has_any(&[
            GeometryKind::SPHERE_ID,
            GeometryKind::CUBE_ID,
            GeometryKind::AP3_ID,
        ])
    }

    pub fn is_180(&self) -> bool {
        self.has_geometry(GeometryKind::EQUIDOME_ID)
    }

    pub fn control_room_type(&self) -> Option<ControlRoomType> {
        if !self.is_control_room() {
            return None;
        }
        if self.has_geometry(GeometryKind::CONTROL_ROOM_V1_ID) {
            Some(ControlRoomType::V1)
        } else {
            Some(ControlRoomType::V2)
        }
    }

    /// Yaw limit from the initial position.
    pub fn rotation_y_limit(&self) -> f64 {
        if self.is_180() {
            PI / 4.0
        } else {
            f64::INFINITY
        }
    }

    /// Pitch limit from the initial position, the same for every camera.
    pub fn rotation_x_limit(&self) -> f64 {
        PI / 6.0
    }

    pub fn displayable_name(&self) -> String {
        if self.is_control_room() {
            format!("Control Room - {}", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn viewport_offset_number(&self) -> i32 {
        self.viewport_offset
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// V3 cameras take the count from their viewport matrix; older cameras are a
    /// single viewport when any of their geometries is, otherwise the 18-camera rig.
    pub fn viewport_count(&self) -> usize {
        if let Some(matrix) = &self.viewport_matrix {
            return matrix.viewport_count();
        }
        const SINGLE: [&str; 5] = ["1", "7", "6", "11", "12"];
        if self.has_any(&SINGLE) {
            1
        } else {
            18
        }
    }

    /// Only single-viewport cameras use the flat map; quad and larger rigs share
    /// the 16-column grid.
    pub fn viewport_map(&self) -> &'static ViewportMap {
        if self.viewport_count() == 1 {
            &VIEWPORT_MAP_SINGLE
        } else {
            &VIEWPORT_MAP_16
        }
    }

    /// Stream URL for this camera.
    ///
    /// V3 cameras with a bitrate pick the first representation of the first
    /// viewport whose bandwidth fits, falling back to the first one listed; without
    /// a bitrate they take the highest bandwidth. Older cameras return their URL.
    pub fn url(&self, bitrate: Option<i64>) -> Result<String> {
        let base = self.base_url.clone().unwrap_or_default();
        if !self.is_v3 {
            return Ok(base);
        }

        let representations = self
            .viewport_matrix
            .as_ref()
            .and_then(|m| m.viewports.first())
            .map(|v| v.representations.as_slice())
            .unwrap_or_default();

        match bitrate {
            Some(bitrate) if bitrate < 0 => Err(Error::NegativeBitrate(bitrate)),
            Some(bitrate) => {
                let Some(first) = representations.first() else {
                    return Ok(String::new());
                };
                let fitting = representations
                    .iter()
                    .find(|r| r.bandwidth <= bitrate)
                    .map(|r| r.stream.as_str())
                    .unwrap_or_default();
                if fitting.is_empty() {
                    Ok(base + &first.stream)
                } else {
                    Ok(base + fitting)
                }
            }
            None => {
                let best = representations
                    .iter()
                    .max_by_key(|r| r.bandwidth)
                    .map(|r| r.stream.as_str())
                    .unwrap_or_default();
                Ok(base + best)
            }
        }
    }
}
