// controller.rs - single owner of orientation, camera selection and gaze state
//
// Input arrives at any time through `push` and is applied at the start of the
// next frame, so everything computed for a frame sees one consistent state.

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};

use glam::{DVec2, Mat4};

use crate::camera::Camera;
use crate::config::VideoConfig;
use crate::error::{Error, Result};
use crate::gaze::{gaze_degrees, GazeTracker};
use crate::orientation::{projection_matrix, Attitude, DeviceOrientation, Orientation, RotationLimits};
use crate::scene::{GeometrySet, SignalingVersion};
use crate::selection::{CameraSelection, Clock, SystemClock, ViewportChange};
use crate::signaling::Signaling;

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Drag delta in screen points since the last event.
    Drag(DVec2),
    /// Drag released with this velocity in points per second.
    DragEnded(DVec2),
    /// Pinch factor relative to the gesture start.
    Pinch(f64),
    PinchEnded,
    Rotate(f64),
    StopMovement,
    Recenter,
    SelectCamera(Camera),
    /// The stream of the pending camera is live.
    VideoReady,
    Attitude(Attitude),
    DeviceOrientation(DeviceOrientation),
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    /// One matrix per draw of the geometry set, in draw order.
    pub mvps: Vec<Mat4>,
    /// False for spherical sets until the first `VideoReady`.
    pub visible: bool,
}

pub struct Controller {
    config: VideoConfig,
    cameras: Vec<Camera>,
    scene: GeometrySet,
    orientation: Orientation,
    selection: CameraSelection,
    gaze: GazeTracker,
    inputs: VecDeque<Input>,
    events: Sender<ViewportChange>,
    clock: Box<dyn Clock>,
    pending_warned: bool,
    /// Set by the first `VideoReady`; spherical sets stay hidden until then.
    video_started: bool,
}

impl Controller {
    /// Builds the controller for a stream and returns the receiving end of its
    /// analytics channel.
    pub fn new(
        config: VideoConfig,
        version: SignalingVersion,
        passthrough: bool,
        signaling: Option<&Signaling>,
    ) -> (Self, Receiver<ViewportChange>) {
        Self::with_clock(config, version, passthrough, signaling, Box::new(SystemClock))
    }

    pub fn with_clock(
        config: VideoConfig,
        version: SignalingVersion,
        passthrough: bool,
        signaling: Option<&Signaling>,
        clock: Box<dyn Clock>,
    ) -> (Self, Receiver<ViewportChange>) {
        let (cameras, geometry_ids, rows) = match (version, signaling) {
            (SignalingVersion::V2 | SignalingVersion::V3, Some(signaling)) => (
                signaling.cameras.clone(),
                signaling.all_geometries(),
                signaling.number_of_rows_for_crv2(),
            ),
            _ => (Vec::new(), Vec::new(), 0),
        };
        let initial = match version {
            SignalingVersion::NsEquirectangularMono => Camera::ns_equirectangular_mono(),
            SignalingVersion::NsFlatMono => Camera::ns_flat_mono(),
            SignalingVersion::V2 | SignalingVersion::V3 => {
                cameras.first().cloned().unwrap_or_else(Camera::empty)
            }
        };

        let (events, receiver) = channel();
        let mut controller = Self {
            config,
            cameras,
            scene: GeometrySet::new(version, passthrough, geometry_ids, rows),
            orientation: Orientation::new(),
            selection: CameraSelection::default(),
            gaze: GazeTracker::default(),
            inputs: VecDeque::new(),
            events,
            clock,
            pending_warned: false,
            video_started: false,
        };
        controller.select(initial);
        (controller, receiver)
    }

    pub fn push(&mut self, input: Input) {
        self.inputs.push_back(input);
    }

    /// Queues a camera from the stream's signaling by id.
    pub fn select_camera_id(&mut self, id: i32) -> Result<()> {
        let camera = self
            .cameras
            .iter()
            .find(|camera| camera.id == id)
            .cloned()
            .ok_or(Error::UnknownCamera(id))?;
        self.push(Input::SelectCamera(camera));
        Ok(())
    }

    /// Queues the camera after the most recently selected one, wrapping around.
    pub fn select_next_camera(&mut self) {
        if self.cameras.is_empty() {
            return;
        }
        let latest = self.selection.pending().or(self.selection.current()).map(|c| c.id);
        let next = self
            .cameras
            .iter()
            .position(|camera| Some(camera.id) == latest)
            .map_or(0, |index| (index + 1) % self.cameras.len());
        self.push(Input::SelectCamera(self.cameras[next].clone()));
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn scene(&self) -> &GeometrySet {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut GeometrySet {
        &mut self.scene
    }

    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    pub fn selection(&self) -> &CameraSelection {
        &self.selection
    }

    pub fn current_camera(&self) -> Option<&Camera> {
        self.selection.current()
    }

    pub fn viewport(&self) -> i32 {
        self.gaze.viewport()
    }

    fn select(&mut self, camera: Camera) {
        self.orientation.stop_deceleration();
        self.pending_warned = false;
        let now = self.clock.now_ms();
        if self.selection.select(camera, now) {
            self.activate_current();
        }
    }

    fn activate_current(&mut self) {
        let limits = self.selection.current().map(RotationLimits::for_camera);
        self.orientation.set_limits(limits);
        self.orientation.recenter();
    }

    fn emit(&self, change: ViewportChange) {
        if self.events.send(change).is_err() {
            log::debug!("analytics receiver dropped");
        }
    }

    fn apply(&mut self, input: Input) {
        match input {
            Input::Drag(delta) => self.orientation.drag(delta),
            Input::DragEnded(velocity) => self.orientation.start_deceleration(velocity),
            Input::Pinch(factor) => self.orientation.pinch_changed(factor),
            Input::PinchEnded => self.orientation.pinch_ended(),
            Input::Rotate(radians) => self.orientation.apply_rotation(radians),
            Input::StopMovement => self.orientation.stop_deceleration(),
            Input::Recenter => self.orientation.recenter(),
            Input::SelectCamera(camera) => self.select(camera),
            Input::VideoReady => {
                self.video_started = true;
                let outcome = self.selection.on_video_ready(self.clock.now_ms());
                self.orientation.mark_frame_received();
                let promoted = outcome.change.is_some();
                if let Some(change) = outcome.change {
                    self.emit(change);
                }
                if promoted {
                    self.activate_current();
                }
                if outcome.gyroscope != self.orientation.gyroscope_enabled() {
                    self.orientation.set_gyroscope_enabled(outcome.gyroscope);
                }
            }
            Input::Attitude(attitude) => self.orientation.update_attitude(attitude),
            Input::DeviceOrientation(device) => self.orientation.set_device_orientation(device),
        }
    }

    fn warn_if_stale(&mut self, now: i64) {
        let (Some(threshold), Some(since)) =
            (self.config.pending_camera_warn_ms, self.selection.pending_since())
        else {
            return;
        };
        if !self.pending_warned && now - since >= threshold as i64 {
            if let Some(pending) = self.selection.pending() {
                log::warn!(
                    "camera {} selected {} ms ago is still waiting for its stream",
                    pending.id,
                    now - since
                );
            }
            self.pending_warned = true;
        }
    }

    /// Applies queued input, advances inertia by `dt` seconds, resolves the gazed
    /// viewport and returns the per-draw matrices.
    pub fn frame(&mut self, dt: f64) -> FrameOutput {
        while let Some(input) = self.inputs.pop_front() {
            self.apply(input);
        }
        self.orientation.tick_deceleration(dt);

        let now = self.clock.now_ms();
        self.warn_if_stale(now);

        let view = self.orientation.view_matrix();
        let projection = projection_matrix(self.config.field_of_view_radians());

        if let Some(camera) = self.selection.current() {
            let change = self.gaze.update(
                gaze_degrees(self.orientation.pitch()),
                gaze_degrees(self.orientation.yaw()),
                camera,
                self.selection.change_timestamp(),
                now,
            );
            if let Some(change) = change {
                self.emit(change);
            }
        }

        let mvps = self
            .scene
            .draws()
            .iter()
            .map(|draw| self.scene.mvp(draw, view, projection))
            .collect();
        FrameOutput {
            mvps,
            visible: self.video_started || !self.scene.needs_video_start(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<i64>>);

    impl ManualClock {
        fn set(&self, ms: i64) {
            self.0.set(ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.get()
        }
    }

    const DOC: &str = r#"{"cameras": [
        {"name": "Rig", "id": 1, "geometries": "2"},
        {"name": "Flat", "id": 2, "geometries": "7"},
        {"name": "Dome", "id": 3, "geometries": "6"}
    ]}"#;

    fn controller(clock: &ManualClock) -> (Controller, Receiver<ViewportChange>) {
        let signaling = Signaling::from_json(DOC).unwrap();
        Controller::with_clock(
            VideoConfig::default(),
            SignalingVersion::V2,
            false,
            Some(&signaling),
            Box::new(clock.clone()),
        )
    }

    #[test]
    fn first_camera_is_active_and_centered() {
        let clock = ManualClock::default();
        clock.set(1_000);
        let (mut controller, _rx) = controller(&clock);
        assert_eq!(controller.current_camera().map(|c| c.id), Some(1));

        let frame = controller.frame(1.0 / 60.0);
        assert_eq!(frame.mvps.len(), 3);
        assert_eq!(controller.orientation().yaw(), 0.0);
    }

    #[test]
    fn spherical_sets_wait_for_the_stream() {
        let clock = ManualClock::default();
        let (mut controller, _rx) = controller(&clock);
        assert!(controller.scene().needs_video_start());
        assert!(!controller.frame(1.0 / 60.0).visible);
        assert!(!controller.frame(1.0 / 60.0).visible);

        controller.push(Input::VideoReady);
        assert!(controller.frame(1.0 / 60.0).visible);
        assert!(controller.frame(1.0 / 60.0).visible);
    }

    #[test]
    fn input_waits_for_the_frame_boundary() {
        let clock = ManualClock::default();
        let (mut controller, _rx) = controller(&clock);
        controller.push(Input::Drag(DVec2::new(100.0, 0.0)));
        assert_eq!(controller.orientation().yaw(), 0.0);
        controller.frame(0.0);
        assert!((controller.orientation().yaw() + 0.2).abs() < 1e-9);
    }

    #[test]
    fn camera_switch_reports_and_recenters() {
        let clock = ManualClock::default();
        clock.set(5_000);
        let (mut controller, rx) = controller(&clock);
        controller.frame(0.0);
        while rx.try_recv().is_ok() {}

        controller.push(Input::Rotate(0.5));
        controller.select_camera_id(3).unwrap();
        controller.frame(0.0);
        assert_eq!(controller.current_camera().map(|c| c.id), Some(1));

        clock.set(5_750);
        controller.push(Input::VideoReady);
        controller.frame(0.0);
        assert_eq!(controller.current_camera().map(|c| c.id), Some(3));
        assert_eq!(controller.orientation().yaw(), 0.0);
        // dome limits now apply
        assert_eq!(
            controller.orientation().limits().map(|l| l.yaw),
            Some(std::f64::consts::PI / 4.0)
        );

        // gaze changes share the channel
        let change = rx.try_iter().find(|c| c.is_cam_change).unwrap();
        assert_eq!((change.start_viewport, change.end_viewport), (1, 3));
        assert_eq!(change.change_time, 750);
    }

    #[test]
    fn flat_cameras_turn_the_gyro_off() {
        let clock = ManualClock::default();
        clock.set(1_000);
        let (mut controller, _rx) = controller(&clock);
        controller.push(Input::VideoReady);
        controller.frame(0.0);
        assert!(controller.orientation().gyroscope_enabled());

        controller.select_camera_id(2).unwrap();
        controller.push(Input::VideoReady);
        controller.frame(0.0);
        assert!(!controller.orientation().gyroscope_enabled());
    }

    #[test]
    fn unknown_camera_is_an_error() {
        let clock = ManualClock::default();
        let (mut controller, _rx) = controller(&clock);
        assert!(matches!(
            controller.select_camera_id(77),
            Err(Error::UnknownCamera(77))
        ));
    }

    #[test]
    fn next_camera_wraps_around() {
        let clock = ManualClock::default();
        clock.set(1_000);
        let (mut controller, _rx) = controller(&clock);
        for expected in [2, 3, 1] {
            controller.select_next_camera();
            controller.push(Input::VideoReady);
            controller.frame(0.0);
            assert_eq!(controller.current_camera().map(|c| c.id), Some(expected));
        }
    }

    #[test]
    fn selecting_a_camera_cancels_inertia() {
        let clock = ManualClock::default();
        let (mut controller, _rx) = controller(&clock);
        controller.push(Input::DragEnded(DVec2::new(500.0, 0.0)));
        controller.frame(1.0 / 60.0);
        assert!(controller.orientation().is_decelerating());

        controller.select_camera_id(2).unwrap();
        controller.frame(1.0 / 60.0);
        assert!(!controller.orientation().is_decelerating());
    }

    #[test]
    fn flat_no_signaling_stream_uses_identity() {
        let (mut controller, _rx) = Controller::new(
            VideoConfig::default(),
            SignalingVersion::NsFlatMono,
            false,
            None,
        );
        controller.push(Input::Drag(DVec2::new(30.0, 10.0)));
        let frame = controller.frame(0.0);
        assert_eq!(frame.mvps, vec![Mat4::IDENTITY]);
        // flat sets draw without waiting for the stream
        assert!(frame.visible);
        assert!(controller.current_camera().unwrap().is_flat_camera());
    }
}
