// cube.rs - CM32 cube map, 3x2 atlas
//
//  -----------------------
// |10   22|20    7|19   23|
// | right | left  | top   |
// |4    17|13    2|8    11|
// |-------+-------+-------|
// |1     5|6     9|21   18|
// | bottom| front | back  |
// |14   16|0     3|15   12|
//  -----------------------

use super::Vertex;

const SIDE: f32 = 1.0;

/// Vertex index placed at each of the 4x6 atlas corner slots.
const TEXTURE_MAP: [[usize; 6]; 4] = [
    [19, 23, 6, 9, 21, 18],
    [8, 11, 0, 3, 15, 12],
    [10, 22, 20, 7, 1, 5],
    [4, 17, 13, 2, 14, 16],
];

const TRIANGLES: [u32; 36] = [
    4, 17, 10, 10, 17, 22, // right
    0, 3, 6, 6, 3, 9, // front
    15, 12, 21, 21, 12, 18, // back
    13, 2, 20, 20, 2, 7, // left
    8, 11, 19, 19, 11, 23, // top
    14, 16, 1, 1, 16, 5, // bottom
];

pub(super) fn build(expansion_coefficient: f32) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(24);

    // each corner is emitted three times so every face owns its own UV
    for i in 0..8 {
        let a = (i & 1) as f32;
        let b = ((i & 2) >> 1) as f32;
        let c = ((i & 4) >> 2) as f32;
        let x = -(a - 0.5) * SIDE;
        let y = (b - 0.5) * SIDE;
        let z = (c - 0.5) * SIDE;
        for _ in 0..3 {
            vertices.push(Vertex::new(-x, -y, z, 0.0, 0.0));
        }
    }

    for (slot, uv) in atlas_uvs(expansion_coefficient) {
        vertices[slot].uv = uv;
    }

    (vertices, TRIANGLES.to_vec())
}

/// UV for every atlas slot, keyed by the vertex that owns it.
pub(super) fn atlas_uvs(expansion_coefficient: f32) -> Vec<(usize, [f32; 2])> {
    let padding = (1.0 - 1.0 / expansion_coefficient) / 6.0;
    let mut uvs = Vec::with_capacity(24);

    for (i, row) in TEXTURE_MAP.iter().enumerate() {
        for (j, &slot) in row.iter().enumerate() {
            // even columns open to the right, even rows open downwards
            let h_pad = if j % 2 == 0 { padding } else { -padding };
            let v_pad = if i % 2 == 0 { -padding * 1.5 } else { padding * 1.5 };

            let u = (j as f32 / 2.0).ceil() / 3.0 + h_pad;
            let v = 1.0 - (i as f32 / 2.0).ceil() / 2.0 + v_pad;
            uvs.push((slot, [u, v]));
        }
    }
    uvs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::DEFAULT_EXPANSION_COEFFICIENT;

    #[test]
    fn twenty_four_vertices_thirty_six_indices() {
        let (vertices, indices) = build(DEFAULT_EXPANSION_COEFFICIENT);
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
    }

    #[test]
    fn atlas_slots_cover_every_vertex_once() {
        let mut slots: Vec<usize> = atlas_uvs(DEFAULT_EXPANSION_COEFFICIENT)
            .into_iter()
            .map(|(slot, _)| slot)
            .collect();
        slots.sort_unstable();
        assert_eq!(slots, (0..24).collect::<Vec<_>>());
    }

    #[test]
    fn atlas_uvs_are_distinct_and_normalised() {
        let (vertices, _) = build(DEFAULT_EXPANSION_COEFFICIENT);
        for (i, a) in vertices.iter().enumerate() {
            assert!((0.0..=1.0).contains(&a.uv[0]) && (0.0..=1.0).contains(&a.uv[1]));
            for b in &vertices[i + 1..] {
                assert_ne!(a.uv, b.uv);
            }
        }
    }

    #[test]
    fn corners_are_triplicated() {
        let (vertices, _) = build(DEFAULT_EXPANSION_COEFFICIENT);
        for corner in vertices.chunks(3) {
            assert_eq!(corner[0].position, corner[1].position);
            assert_eq!(corner[1].position, corner[2].position);
        }
        assert_eq!(vertices[0].position, [-0.5, 0.5, -0.5, 1.0]);
    }
}
