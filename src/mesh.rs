// mesh.rs - procedural geometries the video frame is mapped onto
//
// Every generator is a total function of fixed constants (plus the row layout for
// control room v2). Positions are homogeneous, UVs use a top-left texture origin.

mod ap3;
mod control_room;
mod cube;
mod equidome;
mod panel;
mod sphere;

use glam::{Mat4, Vec3};

use crate::layout::ControlRoomV2Layout;

pub use ap3::Ap3Counts;

/// Inset applied to atlas cells so bilinear sampling never bleeds into a neighbour.
pub const DEFAULT_EXPANSION_COEFFICIENT: f32 = 1.03;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y, z, 1.0],
            uv: [u, v],
        }
    }
}

/// Model transform attached to a mesh. Identity for everything except the dome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Transform {
    /// translate * scale * rotate, rotation applied as X then Y then Z matrices.
    pub fn matrix(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z);
        Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.scale)) * rotation
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryKind {
    Sphere,
    Cube,
    Equidome,
    FlatPanel,
    Ap3,
    ControlRoomV1,
    ControlRoomV2(ControlRoomV2Layout),
}

impl GeometryKind {
    pub const SPHERE_ID: &'static str = "1";
    pub const CUBE_ID: &'static str = "2";
    pub const EQUIDOME_ID: &'static str = "6";
    pub const FLAT_PANEL_ID: &'static str = "7";
    pub const AP3_ID: &'static str = "10";
    pub const CONTROL_ROOM_V1_ID: &'static str = "11";
    pub const CONTROL_ROOM_V2_ID: &'static str = "12";

    /// Maps a signaling geometry id onto a generator. Unknown ids yield `None`.
    pub fn from_id(id: &str, control_room: ControlRoomV2Layout) -> Option<Self> {
        match id.trim() {
            Self::SPHERE_ID => Some(Self::Sphere),
            Self::CUBE_ID => Some(Self::Cube),
            Self::EQUIDOME_ID => Some(Self::Equidome),
            Self::FLAT_PANEL_ID => Some(Self::FlatPanel),
            Self::AP3_ID => Some(Self::Ap3),
            Self::CONTROL_ROOM_V1_ID => Some(Self::ControlRoomV1),
            Self::CONTROL_ROOM_V2_ID => Some(Self::ControlRoomV2(control_room)),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Sphere => Self::SPHERE_ID,
            Self::Cube => Self::CUBE_ID,
            Self::Equidome => Self::EQUIDOME_ID,
            Self::FlatPanel => Self::FLAT_PANEL_ID,
            Self::Ap3 => Self::AP3_ID,
            Self::ControlRoomV1 => Self::CONTROL_ROOM_V1_ID,
            Self::ControlRoomV2(_) => Self::CONTROL_ROOM_V2_ID,
        }
    }

    /// Solid colour used by the debug shader path.
    pub fn color(&self) -> [f32; 4] {
        match self {
            Self::Sphere | Self::Equidome => [0.0, 1.0, 1.0, 1.0],
            Self::Cube => [0.0, 0.0, 1.0, 1.0],
            Self::FlatPanel => [1.0, 1.0, 0.0, 1.0],
            Self::Ap3 => [0.0, 0.5, 0.0, 1.0],
            Self::ControlRoomV1 => [1.0, 1.0, 1.0, 1.0],
            Self::ControlRoomV2(_) => [0.5, 0.0, 0.0, 1.0],
        }
    }

    /// Spherical meshes wait for the first orientation update before drawing.
    pub fn is_spherical(&self) -> bool {
        matches!(self, Self::Sphere | Self::Cube | Self::Equidome | Self::Ap3)
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub kind: GeometryKind,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub color: [f32; 4],
    pub transform: Transform,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

pub fn generate(kind: GeometryKind) -> Mesh {
    let (vertices, indices) = match kind {
        GeometryKind::Sphere => sphere::build(),
        GeometryKind::Cube => cube::build(DEFAULT_EXPANSION_COEFFICIENT),
        GeometryKind::Equidome => equidome::build(),
        GeometryKind::FlatPanel => panel::build(DEFAULT_EXPANSION_COEFFICIENT),
        GeometryKind::Ap3 => ap3::build(),
        GeometryKind::ControlRoomV1 => control_room::build_v1(),
        GeometryKind::ControlRoomV2(layout) => control_room::build_v2(&layout),
    };

    let transform = match kind {
        GeometryKind::Equidome => equidome::transform(),
        _ => Transform::default(),
    };

    Mesh {
        kind,
        vertices,
        indices,
        color: kind.color(),
        transform,
    }
}

/// Normalised latitude of grid row `y`. The first and last `pole` rows are squeezed
/// into a single uniform band each so the poles get extra rows without stretching.
pub(crate) fn band_fraction(y: usize, vertical: usize, uniform: f32, pole: f32) -> f32 {
    let pole_rows = pole as usize;
    if y <= pole_rows {
        y as f32 / (pole + 1.0) / uniform
    } else if y >= vertical - pole_rows {
        let a = y as f32 - (vertical as f32 - pole - 1.0);
        (uniform - 1.0 + a / (pole + 1.0)) / uniform
    } else {
        (y as f32 - pole) / uniform
    }
}

/// Two triangles per cell of a `(horizontal + 1) x (vertical + 1)` vertex grid whose
/// first vertex sits at `base`. Columns are walked outermost.
pub(crate) fn grid_indices(
    horizontal: usize,
    vertical: usize,
    base: usize,
    reversed: bool,
    out: &mut Vec<u32>,
) {
    let row = horizontal + 1;
    for x in 0..horizontal {
        for y in 0..vertical {
            let a = ((y + 1) * row + x + 1 + base) as u32;
            let b = (y * row + x + 1 + base) as u32;
            let c = ((y + 1) * row + x + base) as u32;
            let f = (y * row + x + base) as u32;
            if reversed {
                out.extend_from_slice(&[f, b, c, c, b, a]);
            } else {
                out.extend_from_slice(&[a, b, c, c, b, f]);
            }
        }
    }
}
