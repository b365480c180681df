// scene.rs - the set of meshes drawn for the current stream

use std::str::FromStr;

use glam::Mat4;

use crate::error::Error;
use crate::layout::{thumbnail_rect, ControlRoomV2Layout, MosaicLayout, Rect, MAX_THUMBNAILS};
use crate::mesh::{generate, GeometryKind, Mesh, Vertex};

/// How the stream describes its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingVersion {
    V2,
    V3,
    /// No signaling document; play on the sphere.
    NsEquirectangularMono,
    /// No signaling document; play on a flat panel.
    NsFlatMono,
}

impl SignalingVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::NsEquirectangularMono => "ns_equirectangular_mono",
            Self::NsFlatMono => "ns_flat_mono",
        }
    }

    pub fn has_signaling_file(&self) -> bool {
        matches!(self, Self::V2 | Self::V3)
    }
}

impl FromStr for SignalingVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v2" => Ok(Self::V2),
            "v3" => Ok(Self::V3),
            "ns_equirectangular_mono" => Ok(Self::NsEquirectangularMono),
            "ns_flat_mono" => Ok(Self::NsFlatMono),
            other => Err(Error::UnknownSignalingVersion(other.to_owned())),
        }
    }
}

impl std::fmt::Display for SignalingVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mesh inside the shared vertex/index buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRange {
    pub kind: GeometryKind,
    /// Added to every index of the draw (indices are local to the mesh).
    pub vertex_offset: u32,
    pub index_offset: u32,
    pub index_count: u32,
    pub color: [f32; 4],
    pub model: Mat4,
}

#[derive(Debug, Clone)]
pub struct GeometrySet {
    version: SignalingVersion,
    passthrough: bool,
    geometry_ids: Vec<String>,
    control_room: ControlRoomV2Layout,
    meshes: Vec<Mesh>,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    draws: Vec<DrawRange>,
}

impl GeometrySet {
    /// `geometry_ids` are only consulted for signaled streams; `crv2_rows` sizes the
    /// control room v2 layout and is raised to one when zero.
    pub fn new(
        version: SignalingVersion,
        passthrough: bool,
        geometry_ids: Vec<String>,
        crv2_rows: u32,
    ) -> Self {
        if crv2_rows == 0 && geometry_ids.iter().any(|id| id == GeometryKind::CONTROL_ROOM_V2_ID) {
            log::warn!("control room v2 without thumbnail rows, using one row");
        }
        let mut set = Self {
            version,
            passthrough,
            geometry_ids,
            control_room: ControlRoomV2Layout::clamped(crv2_rows),
            meshes: Vec::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            draws: Vec::new(),
        };
        set.meshes = set.valid_geometries().into_iter().map(generate).collect();
        set.rebuild();
        set
    }

    fn valid_geometries(&self) -> Vec<GeometryKind> {
        match self.version {
            SignalingVersion::NsEquirectangularMono => vec![GeometryKind::Sphere],
            SignalingVersion::NsFlatMono => vec![GeometryKind::FlatPanel],
            SignalingVersion::V2 | SignalingVersion::V3 => {
                let mut seen: Vec<&str> = Vec::new();
                let mut kinds = Vec::new();
                for id in &self.geometry_ids {
                    if seen.contains(&id.as_str()) {
                        continue;
                    }
                    seen.push(id.as_str());
                    match GeometryKind::from_id(id, self.control_room) {
                        Some(kind) => kinds.push(kind),
                        None => log::debug!("ignoring unknown geometry id {id:?}"),
                    }
                }
                kinds
            }
        }
    }

    fn rebuild(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draws.clear();
        for mesh in &self.meshes {
            self.draws.push(DrawRange {
                kind: mesh.kind,
                vertex_offset: self.vertices.len() as u32,
                index_offset: self.indices.len() as u32,
                index_count: mesh.index_count() as u32,
                color: mesh.color,
                model: mesh.transform.matrix(),
            });
            self.vertices.extend_from_slice(&mesh.vertices);
            self.indices.extend_from_slice(&mesh.indices);
        }
    }

    /// Replaces every mesh with the single geometry `id`. Unknown ids are ignored
    /// and leave the set unchanged.
    pub fn reset_to(&mut self, id: &str) -> bool {
        let Some(kind) = GeometryKind::from_id(id, self.control_room) else {
            log::debug!("reset to unknown geometry id {id:?} ignored");
            return false;
        };
        self.meshes = vec![generate(kind)];
        self.geometry_ids = vec![id.trim().to_owned()];
        self.rebuild();
        true
    }

    pub fn version(&self) -> SignalingVersion {
        self.version
    }

    pub fn geometry_ids(&self) -> &[String] {
        &self.geometry_ids
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn draws(&self) -> &[DrawRange] {
        &self.draws
    }

    pub fn control_room_layout(&self) -> ControlRoomV2Layout {
        self.control_room
    }

    /// Flat streams shown as-is, without projection.
    pub fn uses_identity_mvp(&self) -> bool {
        if self.version == SignalingVersion::NsFlatMono {
            return true;
        }
        let only = |id: &str| self.geometry_ids.len() == 1 && self.geometry_ids[0] == id;
        self.passthrough
            && (only(GeometryKind::CONTROL_ROOM_V1_ID) || only(GeometryKind::FLAT_PANEL_ID))
    }

    /// Spherical sets stay hidden until the stream reports its first frame.
    pub fn needs_video_start(&self) -> bool {
        self.meshes.iter().any(|mesh| mesh.kind.is_spherical())
    }

    /// Model-view-projection for `draw`.
    pub fn mvp(&self, draw: &DrawRange, view: Mat4, projection: Mat4) -> Mat4 {
        if self.uses_identity_mvp() {
            Mat4::IDENTITY
        } else {
            projection * view * draw.model
        }
    }

    pub fn mosaic_layout(&self) -> Option<MosaicLayout> {
        self.meshes.iter().find_map(|mesh| match mesh.kind {
            GeometryKind::ControlRoomV1 => Some(MosaicLayout::V1),
            GeometryKind::ControlRoomV2(layout) => Some(MosaicLayout::V2(layout)),
            _ => None,
        })
    }

    /// Normalized, top-left origin crop rectangles of the control room thumbnails
    /// for `camera_count` cameras. Cameras past the eighth are dropped. The v2
    /// padding follows the width of the decoded frame.
    pub fn thumbnail_uv_rects(
        &self,
        frame_width: f32,
        frame_height: f32,
        camera_count: usize,
    ) -> Vec<Rect> {
        let layout = match self.mosaic_layout() {
            Some(MosaicLayout::V2(v2)) => MosaicLayout::V2(v2.for_frame_width(frame_width)),
            Some(layout) => layout,
            None => return Vec::new(),
        };
        (0..camera_count.min(MAX_THUMBNAILS))
            .filter_map(|index| thumbnail_rect(index, frame_width, frame_height, &layout))
            .map(|rect| {
                rect.to_top_left(frame_height)
                    .normalized(frame_width, frame_height)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn version_names_round_trip() {
        for version in [
            SignalingVersion::V2,
            SignalingVersion::V3,
            SignalingVersion::NsEquirectangularMono,
            SignalingVersion::NsFlatMono,
        ] {
            assert_eq!(version.as_str().parse::<SignalingVersion>().unwrap(), version);
        }
        assert!(matches!(
            "v4".parse::<SignalingVersion>(),
            Err(Error::UnknownSignalingVersion(_))
        ));
        assert!(!SignalingVersion::NsFlatMono.has_signaling_file());
    }

    #[test]
    fn signaled_ids_are_deduplicated_and_unknown_ones_dropped() {
        let set = GeometrySet::new(SignalingVersion::V2, false, ids(&["2", "7", "2", "99", "7"]), 1);
        let kinds: Vec<&str> = set.meshes().iter().map(|m| m.kind.id()).collect();
        assert_eq!(kinds, vec!["2", "7"]);
    }

    #[test]
    fn no_signaling_modes_force_their_geometry() {
        let sphere = GeometrySet::new(SignalingVersion::NsEquirectangularMono, false, ids(&["7"]), 0);
        assert_eq!(sphere.meshes()[0].kind, GeometryKind::Sphere);
        assert!(sphere.needs_video_start());
        assert!(!sphere.uses_identity_mvp());

        let flat = GeometrySet::new(SignalingVersion::NsFlatMono, false, Vec::new(), 0);
        assert_eq!(flat.meshes()[0].kind, GeometryKind::FlatPanel);
        assert!(flat.uses_identity_mvp());
        assert!(!flat.needs_video_start());
    }

    #[test]
    fn buffers_concatenate_with_offsets() {
        let set = GeometrySet::new(SignalingVersion::V2, false, ids(&["7", "11", "2"]), 1);
        let draws = set.draws();
        assert_eq!(draws.len(), 3);
        assert_eq!((draws[0].vertex_offset, draws[0].index_offset), (0, 0));
        assert_eq!((draws[1].vertex_offset, draws[1].index_offset), (4, 6));
        assert_eq!((draws[2].vertex_offset, draws[2].index_offset), (8, 12));
        assert_eq!(set.vertices().len(), 4 + 4 + 24);
        assert_eq!(set.indices().len(), 6 + 6 + 36);

        for draw in draws {
            let mesh_vertices = set
                .meshes()
                .iter()
                .find(|m| m.kind.id() == draw.kind.id())
                .unwrap()
                .vertex_count() as u32;
            let start = draw.index_offset as usize;
            let end = start + draw.index_count as usize;
            assert!(set.indices()[start..end].iter().all(|&i| i < mesh_vertices));
        }
    }

    #[test]
    fn reset_to_ignores_unknown_ids() {
        let mut set = GeometrySet::new(SignalingVersion::V2, false, ids(&["1", "7"]), 1);
        assert!(!set.reset_to("42"));
        assert_eq!(set.meshes().len(), 2);

        assert!(set.reset_to("6"));
        assert_eq!(set.geometry_ids(), &["6".to_owned()]);
        assert_eq!(set.draws().len(), 1);
        assert_eq!(set.draws()[0].model, set.meshes()[0].transform.matrix());
    }

    #[test]
    fn passthrough_flat_streams_skip_projection() {
        let cr = GeometrySet::new(SignalingVersion::V2, true, ids(&["11"]), 1);
        assert!(cr.uses_identity_mvp());
        let draw = cr.draws()[0];
        let mvp = cr.mvp(&draw, Mat4::from_rotation_y(1.0), Mat4::from_scale(glam::Vec3::splat(2.0)));
        assert_eq!(mvp, Mat4::IDENTITY);

        let not_passthrough = GeometrySet::new(SignalingVersion::V2, false, ids(&["11"]), 1);
        assert!(!not_passthrough.uses_identity_mvp());
        let mixed = GeometrySet::new(SignalingVersion::V2, true, ids(&["11", "7"]), 1);
        assert!(!mixed.uses_identity_mvp());
    }

    #[test]
    fn zero_rows_fall_back_to_one() {
        let set = GeometrySet::new(SignalingVersion::V2, false, ids(&["12"]), 0);
        assert_eq!(set.control_room_layout().rows(), 1);
        assert!(matches!(set.meshes()[0].kind, GeometryKind::ControlRoomV2(l) if l.rows() == 1));
    }

    #[test]
    fn narrow_control_room_frames_crop_with_half_padding() {
        let cr = GeometrySet::new(SignalingVersion::V2, false, ids(&["12"]), 2);
        // half-resolution frame of the 8px padded mosaic
        let rects = cr.thumbnail_uv_rects(960.0, 828.0, 5);
        assert_eq!(rects.len(), 5);

        let height = 1656.0;
        let close = |a: f32, b: f32| (a - b).abs() < 1e-4;
        assert!(close(rects[0].y, (8.0 + 1080.0 + 16.0) / height));
        assert!(close(rects[0].height, 264.0 / height));
        assert!(close(rects[4].y - rects[0].y, (264.0 + 16.0) / height));
        assert!(close(rects[0].x, 16.0 / 1952.0));

        // full-width frames keep the 16px layout
        let wide = cr.thumbnail_uv_rects(1952.0, 1672.0, 1);
        assert!(close(wide[0].y, (16.0 + 1080.0 + 16.0) / 1672.0));
    }

    #[test]
    fn thumbnails_only_for_control_rooms() {
        let sphere = GeometrySet::new(SignalingVersion::V2, false, ids(&["1"]), 1);
        assert!(sphere.thumbnail_uv_rects(1952.0, 1392.0, 4).is_empty());

        let cr = GeometrySet::new(SignalingVersion::V2, false, ids(&["12"]), 2);
        let h = cr.control_room_layout().frame_height();
        let rects = cr.thumbnail_uv_rects(1952.0, h, 12);
        assert_eq!(rects.len(), MAX_THUMBNAILS);
        for rect in rects {
            assert!(rect.x >= 0.0 && rect.x + rect.width <= 1.0);
            assert!(rect.y >= 0.0 && rect.y + rect.height <= 1.0 + 1e-6);
        }
    }
}
