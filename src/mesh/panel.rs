// panel.rs - flat video panel
//
// |2     3|
// | video |
// |0     1|

use super::Vertex;

const TRIANGLES: [u32; 6] = [0, 1, 3, 2, 3, 0];

pub(super) fn build(expansion_coefficient: f32) -> (Vec<Vertex>, Vec<u32>) {
    let padding = (1.0 - 1.0 / expansion_coefficient) / 3.0;
    (quad(padding, padding), TRIANGLES.to_vec())
}

/// Screen-filling quad sampling the frame inset by `h_pad` / `v_pad` on each side.
pub(super) fn quad(h_pad: f32, v_pad: f32) -> Vec<Vertex> {
    vec![
        Vertex::new(-1.0, -1.0, 0.0, h_pad, 1.0 - v_pad),
        Vertex::new(1.0, -1.0, 0.0, 1.0 - h_pad, 1.0 - v_pad),
        Vertex::new(-1.0, 1.0, 0.0, h_pad, v_pad),
        Vertex::new(1.0, 1.0, 0.0, 1.0 - h_pad, v_pad),
    ]
}
