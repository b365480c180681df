// equidome.rs - 180 degree dome

use std::f32::consts::PI;

use glam::Vec3;

use super::{band_fraction, grid_indices, Transform, Vertex};

const RADIUS: f32 = 1.0;
const HORIZONTAL: usize = 32;
const UNIFORM_VERTICAL: f32 = 16.0;
const POLE_VERTICAL: f32 = 0.0;
const VERTICAL: usize = 16;

/// The dome sits slightly in front of the viewer.
const DEPTH_OFFSET: f32 = 0.2;

pub(super) fn build() -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity((VERTICAL + 1) * (HORIZONTAL + 1));

    for y in 0..=VERTICAL {
        let yf = band_fraction(y, VERTICAL, UNIFORM_VERTICAL, POLE_VERTICAL);
        let lat = (yf - 0.5) * PI;
        let cos_lat = lat.cos();
        let pole_row = y == 0 || y == VERTICAL;

        for x in 0..=HORIZONTAL {
            let xf = x as f32 / HORIZONTAL as f32;
            let lon = (1.5 + xf) * PI;
            // pole rows collapse to a point, pin their u to avoid a fan of seams
            let u = if pole_row { 0.5 } else { xf };

            vertices.push(Vertex::new(
                RADIUS * lon.sin() * cos_lat,
                RADIUS * lat.sin(),
                -RADIUS * lon.cos() * cos_lat,
                u,
                1.0 - yf,
            ));
        }
    }

    let mut indices = Vec::with_capacity(VERTICAL * HORIZONTAL * 6);
    grid_indices(HORIZONTAL, VERTICAL, 0, true, &mut indices);

    (vertices, indices)
}

pub(super) fn transform() -> Transform {
    Transform {
        position: Vec3::new(0.0, 0.0, DEPTH_OFFSET),
        ..Transform::default()
    }
}
