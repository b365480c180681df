// ap3.rs - multi-resolution panel
//
// Four patches share one buffer: low-res top and bottom caps, a mid-res side band
// and the high-res front patch. The texture atlas is laid out as
//
//   | front (w/3) | mid band | top cap | bottom cap |
//
// with `PADDING` pixels around every cell. Each patch is stored rotated in the
// atlas, so grid rows advance along u and grid columns along v.

use std::f32::consts::PI;

use super::{grid_indices, Vertex};

// must be a multiple of 4
const VERTICAL: usize = 12 * 4;
// must be a multiple of 3
const HORIZONTAL: usize = 32 * 3;
const VIDEO_WIDTH: f32 = 7680.0;
const VIDEO_HEIGHT: f32 = 3840.0;
const PADDING: f32 = 32.0;
const RADIUS: f32 = 1.0;

const FRONT_VERTICAL: usize = VERTICAL / 2;
const FRONT_HORIZONTAL: usize = HORIZONTAL / 3;
const MID_HORIZONTAL: usize = HORIZONTAL - FRONT_HORIZONTAL;
const CAP_VERTICAL: usize = VERTICAL / 4;

/// Vertex and index counts per patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ap3Counts {
    pub cap_vertices: usize,
    pub mid_vertices: usize,
    pub front_vertices: usize,
    pub cap_indices: usize,
    pub mid_indices: usize,
    pub front_indices: usize,
}

impl Ap3Counts {
    pub const fn new() -> Self {
        Self {
            cap_vertices: (HORIZONTAL + 1) * (CAP_VERTICAL + 1),
            mid_vertices: (MID_HORIZONTAL + 1) * (FRONT_VERTICAL + 1),
            front_vertices: (FRONT_HORIZONTAL + 1) * (FRONT_VERTICAL + 1),
            cap_indices: HORIZONTAL * CAP_VERTICAL * 6,
            mid_indices: MID_HORIZONTAL * FRONT_VERTICAL * 6,
            front_indices: FRONT_HORIZONTAL * FRONT_VERTICAL * 6,
        }
    }

    pub const fn vertex_count(&self) -> usize {
        2 * self.cap_vertices + self.mid_vertices + self.front_vertices
    }

    pub const fn index_count(&self) -> usize {
        2 * self.cap_indices + self.mid_indices + self.front_indices
    }
}

impl Default for Ap3Counts {
    fn default() -> Self {
        Self::new()
    }
}

struct Atlas {
    width: f32,
    height: f32,
}

impl Atlas {
    fn new() -> Self {
        Self {
            width: 8.0 * PADDING + VIDEO_WIDTH / 3.0 + VIDEO_HEIGHT * 5.0 / 16.0,
            height: 2.0 * PADDING + VIDEO_HEIGHT / 2.0,
        }
    }

    fn h_pad(&self) -> f32 {
        PADDING / self.width
    }

    fn v_pad(&self) -> f32 {
        PADDING / self.height
    }

    /// v coordinate for a patch column; every patch spans half the source height.
    fn column_v(&self, xf: f32) -> f32 {
        self.v_pad() + VIDEO_HEIGHT / 2.0 / self.height * xf
    }
}

fn sphere_point(lat: f32, lon: f32) -> [f32; 3] {
    let cos_lat = lat.cos();
    // y flipped so the atlas rows read top to bottom
    [
        RADIUS * lon.sin() * cos_lat,
        -RADIUS * lat.sin(),
        RADIUS * lon.cos() * cos_lat,
    ]
}

pub(super) fn build() -> (Vec<Vertex>, Vec<u32>) {
    let counts = Ap3Counts::new();
    let atlas = Atlas::new();
    let mut vertices = Vec::with_capacity(counts.vertex_count());

    // low-quality caps: rows [0, V/4] on top, [3V/4, V] on the bottom
    let cap_scale = VIDEO_HEIGHT / 4.0 / atlas.width;
    let top_frame = (2.0 * PADDING + VIDEO_WIDTH / 3.0) / atlas.width;
    let bottom_frame =
        (6.0 * PADDING + VIDEO_WIDTH / 3.0 + VIDEO_HEIGHT * 4.0 / 16.0) / atlas.width;

    for (first_row, frame) in [(0, top_frame), (VERTICAL * 3 / 4, bottom_frame)] {
        for y in 0..=CAP_VERTICAL {
            let lat = ((first_row + y) as f32 / VERTICAL as f32 - 0.5) * PI;
            let u = frame + atlas.h_pad() + (y as f32 / VERTICAL as f32) * cap_scale;

            for x in 0..=HORIZONTAL {
                let xf = x as f32 / HORIZONTAL as f32;
                let [px, py, pz] = sphere_point(lat, xf * PI * 2.0);
                vertices.push(Vertex::new(px, py, pz, u, atlas.column_v(xf)));
            }
        }
    }

    // mid-quality band around the sides
    let mid_scale = VIDEO_HEIGHT * 3.0 / 16.0 / atlas.width;
    let mid_frame = (4.0 * PADDING + VIDEO_WIDTH / 3.0 + VIDEO_HEIGHT / 16.0) / atlas.width;
    for y in 0..=FRONT_VERTICAL {
        let yf = y as f32 / FRONT_VERTICAL as f32;
        let lat = (0.25 + yf / 2.0 - 0.5) * PI;
        let u = mid_frame + atlas.h_pad() + yf * mid_scale;

        for x in 0..=MID_HORIZONTAL {
            let lon_f = 1.0 / 3.0 + x as f32 / (3.0 * FRONT_HORIZONTAL as f32);
            let lon = lon_f * PI * 2.0 + PI * 2.0 / 3.0;
            let [px, py, pz] = sphere_point(lat, lon);
            let xf = x as f32 / MID_HORIZONTAL as f32;
            vertices.push(Vertex::new(px, py, pz, u, atlas.column_v(xf)));
        }
    }

    // high-quality front patch, mirrored horizontally in the atlas
    let front_scale = VIDEO_WIDTH / 3.0 / atlas.width;
    for y in 0..=FRONT_VERTICAL {
        let yf = y as f32 / FRONT_VERTICAL as f32;
        let lat = (0.25 + yf / 2.0 - 0.5) * PI;
        let v = atlas.column_v(yf);

        for x in 0..=FRONT_HORIZONTAL {
            let lon_f = 1.0 / 3.0 + x as f32 / (3.0 * FRONT_HORIZONTAL as f32);
            let [px, py, pz] = sphere_point(lat, lon_f * PI * 2.0);
            let xf = x as f32 / FRONT_HORIZONTAL as f32;
            vertices.push(Vertex::new(
                px,
                py,
                pz,
                atlas.h_pad() + (1.0 - xf) * front_scale,
                v,
            ));
        }
    }

    let mut indices = Vec::with_capacity(counts.index_count());
    grid_indices(HORIZONTAL, CAP_VERTICAL, 0, false, &mut indices);
    grid_indices(HORIZONTAL, CAP_VERTICAL, counts.cap_vertices, false, &mut indices);
    grid_indices(
        MID_HORIZONTAL,
        FRONT_VERTICAL,
        2 * counts.cap_vertices,
        false,
        &mut indices,
    );
    grid_indices(
        FRONT_HORIZONTAL,
        FRONT_VERTICAL,
        2 * counts.cap_vertices + counts.mid_vertices,
        false,
        &mut indices,
    );

    (vertices, indices)
}
