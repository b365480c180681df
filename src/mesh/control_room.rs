// control_room.rs - main-video quads of the control room mosaics

use super::{panel, Vertex};
use crate::layout::{ControlRoomV2Layout, RatiosV1};

pub(super) fn build_v1() -> (Vec<Vertex>, Vec<u32>) {
    let h_pad = RatiosV1::EXT_MARGIN_HORIZONTAL;
    let v_pad = (1.0 - RatiosV1::BIG_HEIGHT) / 2.0;
    (panel::quad(h_pad, v_pad), vec![0, 1, 2, 2, 1, 3])
}

/// Quad over the top region of the v2 frame; thumbnails below are cropped separately.
pub(super) fn build_v2(layout: &ControlRoomV2Layout) -> (Vec<Vertex>, Vec<u32>) {
    let left = layout.outer_padding_horizontal();
    let top = layout.outer_padding_vertical();
    let bottom = layout.video_percentage();

    let vertices = vec![
        Vertex::new(-1.0, -1.0, 0.0, left, bottom),
        Vertex::new(-1.0, 1.0, 0.0, left, top),
        Vertex::new(1.0, 1.0, 0.0, 1.0 - left, top),
        Vertex::new(1.0, -1.0, 0.0, 1.0 - left, bottom),
    ];
    (vertices, vec![0, 1, 2, 2, 3, 0])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn v1_samples_the_big_region() {
        let (vertices, indices) = build_v1();
        assert_eq!(indices.len(), 6);
        let v_pad = (1.0 - 720.0 / 1120.0) / 2.0;
        assert!((vertices[0].uv[0] - 16.0 / 1312.0).abs() < EPSILON);
        assert!((vertices[2].uv[1] - v_pad).abs() < EPSILON);
        assert!((vertices[0].uv[1] - (1.0 - v_pad)).abs() < EPSILON);
    }

    #[test]
    fn v2_two_rows_splits_at_video_percentage() {
        let layout = ControlRoomV2Layout::new(2).unwrap();
        let (vertices, _) = build_v2(&layout);

        let frame_height = 1080.0 + 2.0 * 16.0 + 2.0 * 16.0 + 2.0 * 264.0;
        let top = 16.0 / frame_height;
        let split = 1080.0 / (1080.0 + 2.0 * 16.0 + 2.0 * 280.0);

        assert!((vertices[1].uv[1] - top).abs() < EPSILON);
        assert!((vertices[2].uv[1] - top).abs() < EPSILON);
        assert!((vertices[0].uv[1] - split).abs() < EPSILON);
        assert!((vertices[3].uv[1] - split).abs() < EPSILON);
        assert!((vertices[0].uv[0] - 16.0 / 1952.0).abs() < EPSILON);
    }
}
