// gaze.rs - maps the current look direction onto a discrete viewport id

use crate::camera::Camera;
use crate::selection::ViewportChange;

pub const GRID_COLUMNS: usize = 16;
pub const GRID_ROWS: usize = 8;

pub type ViewportMap = [[i32; GRID_COLUMNS]; GRID_ROWS];

/// 18-camera rig. Rows run from one pole to the other, columns around the horizon;
/// the pole rows and the horizon seam pair left/right ids.
pub static VIEWPORT_MAP_16: ViewportMap = [
    [2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2],
    [10, 10, 12, 12, 12, 12, 14, 14, 14, 14, 16, 16, 16, 16, 10, 10],
    [10, 10, 12, 12, 12, 12, 14, 14, 14, 14, 16, 16, 16, 16, 10, 10],
    [4, 6, 6, 0, 0, 8, 8, 5, 5, 7, 7, 1, 1, 9, 9, 4],
    [4, 6, 6, 0, 0, 8, 8, 5, 5, 7, 7, 1, 1, 9, 9, 4],
    [11, 11, 13, 13, 13, 13, 15, 15, 15, 15, 17, 17, 17, 17, 11, 11],
    [11, 11, 13, 13, 13, 13, 15, 15, 15, 15, 17, 17, 17, 17, 11, 11],
    [3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3],
];

/// Single and quad viewport streams always resolve to viewport 0.
pub static VIEWPORT_MAP_SINGLE: ViewportMap = [[0; GRID_COLUMNS]; GRID_ROWS];

/// Converts a yaw or pitch in radians into the 0..=360 degree range the grid uses.
/// Positive angles count backwards from 360.
pub fn gaze_degrees(radians: f64) -> f64 {
    let degrees = radians.to_degrees();
    if degrees >= 0.0 {
        360.0 - degrees
    } else {
        degrees.abs()
    }
}

/// Grid cell `(x, y)` for a gaze direction in degrees, or `None` when it falls
/// outside the lookup table.
pub fn grid_cell(pitch_degrees: f64, yaw_degrees: f64) -> Option<(usize, usize)> {
    let transformed_pitch = (pitch_degrees + 90.0) % 360.0;
    let steps = (GRID_COLUMNS - 1) as f64;
    let x = (steps * yaw_degrees / 360.0).round();
    let y = (steps * transformed_pitch / 360.0).round();

    if x < 0.0 || y < 0.0 || x >= GRID_COLUMNS as f64 || y >= GRID_ROWS as f64 {
        return None;
    }
    Some((x as usize, y as usize))
}

pub fn resolve_viewport(pitch_degrees: f64, yaw_degrees: f64, camera: &Camera) -> Option<i32> {
    let (x, y) = grid_cell(pitch_degrees, yaw_degrees)?;
    Some(camera.viewport_map()[y][x])
}

/// Remembers the last gazed viewport and reports transitions.
#[derive(Debug, Default, Clone)]
pub struct GazeTracker {
    viewport: i32,
}

impl GazeTracker {
    pub fn viewport(&self) -> i32 {
        self.viewport
    }

    /// Resolves the gazed viewport. A direction outside the grid keeps the previous
    /// viewport. `since` is the epoch-ms timestamp of the last camera selection.
    pub fn update(
        &mut self,
        pitch_degrees: f64,
        yaw_degrees: f64,
        camera: &Camera,
        since: i64,
        now: i64,
    ) -> Option<ViewportChange> {
        let Some(gazed) = resolve_viewport(pitch_degrees, yaw_degrees, camera) else {
            log::debug!(
                "viewport out of range (pitch {pitch_degrees:.1}, yaw {yaw_degrees:.1})"
            );
            return None;
        };
        if gazed == self.viewport {
            return None;
        }

        let change = ViewportChange::new(self.viewport, gazed, since, now).with_cam_change(false);
        self.viewport = gazed;
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::ViewportMatrix;

    fn rig_camera() -> Camera {
        Camera::new("rig", 1, "2")
    }

    #[test]
    fn straight_ahead_lands_on_the_horizon_row() {
        // zero yaw/pitch reads as 360 degrees
        assert_eq!(gaze_degrees(0.0), 360.0);
        assert_eq!(grid_cell(gaze_degrees(0.0), gaze_degrees(0.0)), Some((15, 4)));
        assert_eq!(resolve_viewport(360.0, 360.0, &rig_camera()), Some(4));
    }

    #[test]
    fn negative_angles_map_to_their_magnitude() {
        assert!((gaze_degrees(-std::f64::consts::FRAC_PI_2) - 90.0).abs() < 1e-9);
        assert!((gaze_degrees(std::f64::consts::FRAC_PI_2) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn yaw_wraparound_keeps_the_row() {
        let a = grid_cell(45.0, 0.0).unwrap();
        let b = grid_cell(45.0, 359.0).unwrap();
        assert_eq!(a.1, b.1);
        assert_eq!(grid_cell(90.0, 0.0).map(|c| c.1), grid_cell(90.0, 359.0).map(|c| c.1));
    }

    #[test]
    fn out_of_grid_keeps_previous_viewport() {
        let camera = rig_camera();
        let mut tracker = GazeTracker::default();
        let change = tracker.update(360.0, 360.0, &camera, 1_000, 1_500).unwrap();
        assert_eq!((change.start_viewport, change.end_viewport), (0, 4));

        assert_eq!(grid_cell(0.0, 400.0), None);
        assert!(tracker.update(0.0, 400.0, &camera, 1_000, 2_000).is_none());
        assert_eq!(tracker.viewport(), 4);
    }

    #[test]
    fn single_viewport_cameras_never_change() {
        let camera = Camera::new("flat", 2, "7");
        let mut tracker = GazeTracker::default();
        for yaw in [0.0, 90.0, 180.0, 300.0] {
            assert!(tracker.update(10.0, yaw, &camera, 0, 0).is_none());
        }
    }

    #[test]
    fn quad_viewport_cameras_follow_the_grid() {
        let mut camera = Camera::new("quad", 4, "1");
        camera.viewport_matrix = Some(ViewportMatrix {
            viewports: Vec::new(),
            kind: 1,
        });
        camera.is_v3 = true;
        assert_eq!(camera.viewport_count(), 4);

        assert_eq!(resolve_viewport(0.0, 0.0, &camera), Some(4));
        // 270 degrees wraps onto the first pole row
        assert_eq!(resolve_viewport(270.0, 0.0, &camera), Some(2));
        let mut tracker = GazeTracker::default();
        let change = tracker.update(360.0, 360.0, &camera, 0, 0).unwrap();
        assert_eq!(change.end_viewport, 4);
    }

    #[test]
    fn change_reports_elapsed_time_since_selection() {
        let mut tracker = GazeTracker::default();
        let change = tracker
            .update(360.0, 180.0, &rig_camera(), 10_000, 12_500)
            .unwrap();
        assert_eq!(change.change_time, 2_500);
        assert!(!change.is_cam_change);
    }
}
