// sphere.rs - equirectangular sphere with compressed pole bands

use std::f32::consts::PI;

use super::{band_fraction, grid_indices, Vertex};

const RADIUS: f32 = 1.0;
const HORIZONTAL: usize = 64;
const UNIFORM_VERTICAL: f32 = 64.0;
const POLE_VERTICAL: f32 = 4.0;
// UNIFORM_VERTICAL + 2 * POLE_VERTICAL
const VERTICAL: usize = 72;

pub(super) fn build() -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity((VERTICAL + 1) * (HORIZONTAL + 1));

    for y in 0..=VERTICAL {
        let yf = band_fraction(y, VERTICAL, UNIFORM_VERTICAL, POLE_VERTICAL);
        let lat = (yf - 0.5) * PI;
        let cos_lat = lat.cos();

        for x in 0..=HORIZONTAL {
            let xf = x as f32 / HORIZONTAL as f32;
            let lon = (0.5 + xf) * PI * 2.0;

            vertices.push(Vertex::new(
                RADIUS * lon.sin() * cos_lat,
                RADIUS * lat.sin(),
                -RADIUS * lon.cos() * cos_lat,
                xf,
                1.0 - yf,
            ));
        }
    }

    let mut indices = Vec::with_capacity(VERTICAL * HORIZONTAL * 6);
    grid_indices(HORIZONTAL, VERTICAL, 0, false, &mut indices);

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_match_grid() {
        let (vertices, indices) = build();
        assert_eq!(vertices.len(), 73 * 65);
        assert_eq!(indices.len(), 72 * 64 * 6);
    }

    #[test]
    fn vertices_lie_on_sphere() {
        let (vertices, _) = build();
        for v in &vertices {
            let [x, y, z, w] = v.position;
            assert_eq!(w, 1.0);
            let len = (x * x + y * y + z * z).sqrt();
            assert!((len - RADIUS).abs() < 1e-5, "{len}");
        }
    }

    #[test]
    fn uv_covers_full_frame() {
        let (vertices, _) = build();
        let first = vertices.first().unwrap().uv;
        let last = vertices.last().unwrap().uv;
        assert_eq!(first, [0.0, 1.0]);
        assert!((last[0] - 1.0).abs() < 1e-6);
        assert!(last[1].abs() < 1e-6);
    }
}
