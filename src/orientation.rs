// orientation.rs - look direction from drag, inertia, pinch and gyroscope input

use std::f64::consts::{PI, TAU};

use glam::{DVec2, Mat4, Quat, Vec3};

use crate::camera::Camera;

/// Radians of rotation per dragged point at zoom 1.
pub const RADIANS_PER_POINT: f64 = 0.002;
pub const DEFAULT_FRICTION: f64 = 0.97;
const MAX_FRICTION: f64 = 0.999;
/// Inertia stops once both velocity components fall below this.
pub const VELOCITY_EPSILON: f64 = 0.001;
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 2.0;

pub const VIDEO_ASPECT: f32 = 1280.0 / 720.0;
const NEAR_Z: f32 = 0.1;
const FAR_Z: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Rotation around X, looking up and down.
    Pitch,
    /// Rotation around Y, looking around.
    Yaw,
}

/// Clamps `value` into `[-limit, limit]`.
pub fn clamp_rotation(value: f64, limit: f64) -> f64 {
    value.clamp(-limit, limit)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationLimits {
    pub pitch: f64,
    pub yaw: f64,
}

impl RotationLimits {
    pub fn for_camera(camera: &Camera) -> Self {
        Self {
            pitch: camera.rotation_x_limit(),
            yaw: camera.rotation_y_limit(),
        }
    }

    fn for_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pitch => self.pitch,
            Axis::Yaw => self.yaw,
        }
    }
}

/// Device attitude as reported by the motion sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub rotation: Quat,
    /// Pitch of the device in radians, used to detect a portrait start.
    pub pitch: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceOrientation {
    #[default]
    LandscapeLeft,
    LandscapeRight,
}

#[derive(Debug, Default)]
struct Gyro {
    enabled: bool,
    initial: Option<Attitude>,
    latest: Option<Attitude>,
    initially_portrait: bool,
}

impl Gyro {
    /// Attitude relative to the first sample since the last recenter.
    fn relative(&mut self) -> Option<Quat> {
        let latest = self.latest?;
        let initial = *self.initial.get_or_insert_with(|| latest);
        // within 45 degrees of portrait
        self.initially_portrait = initial.pitch.abs() > PI / 4.0;
        Some(initial.rotation.inverse() * latest.rotation)
    }
}

/// Rotation accumulator for the active camera.
///
/// Writes are clamped to the camera's limits and ignored while no camera is set.
#[derive(Debug)]
pub struct Orientation {
    rotation_x: f64,
    rotation_y: f64,
    scale: f64,
    last_scale: f64,
    limits: Option<RotationLimits>,
    velocity: Option<DVec2>,
    friction: f64,
    gyro: Gyro,
    device: DeviceOrientation,
    has_frame: bool,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::new()
    }
}

impl Orientation {
    pub fn new() -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            scale: 1.0,
            last_scale: 1.0,
            limits: None,
            velocity: None,
            friction: DEFAULT_FRICTION,
            gyro: Gyro::default(),
            device: DeviceOrientation::default(),
            has_frame: false,
        }
    }

    pub fn set_limits(&mut self, limits: Option<RotationLimits>) {
        self.limits = limits;
    }

    pub fn limits(&self) -> Option<RotationLimits> {
        self.limits
    }

    pub fn rotation(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pitch => self.rotation_x,
            Axis::Yaw => self.rotation_y,
        }
    }

    /// Writes a clamped rotation and returns the stored value.
    pub fn set_rotation(&mut self, axis: Axis, value: f64) -> f64 {
        let Some(limits) = self.limits else {
            return self.rotation(axis);
        };
        let clamped = clamp_rotation(value, limits.for_axis(axis));
        match axis {
            Axis::Pitch => self.rotation_x = clamped,
            Axis::Yaw => self.rotation_y = clamped,
        }
        clamped
    }

    /// Yaw in radians wrapped into `(-PI, PI]`.
    pub fn yaw(&self) -> f64 {
        let rotation = self.rotation_y % TAU;
        if rotation > PI {
            rotation - TAU
        } else if rotation < -PI {
            rotation + TAU
        } else {
            rotation
        }
    }

    pub fn pitch(&self) -> f64 {
        -self.rotation_x
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Turns the view by `radians`. The sign is inverted to match screen coordinates.
    pub fn apply_rotation(&mut self, radians: f64) {
        self.set_rotation(Axis::Yaw, (self.rotation_y - radians) % TAU);
    }

    /// Applies a drag of `point` screen points. Returns whether each axis moved,
    /// as `(pitch, yaw)`.
    pub fn handle_translation(&mut self, point: DVec2) -> (bool, bool) {
        let radians_per_point = RADIANS_PER_POINT / self.scale;
        let diff_yaw = point.x * -radians_per_point;
        let diff_pitch = point.y * -radians_per_point;

        self.set_rotation(Axis::Pitch, self.rotation_x + diff_pitch);
        self.set_rotation(Axis::Yaw, self.rotation_y + diff_yaw);

        (diff_pitch != 0.0, diff_yaw != 0.0)
    }

    /// A new drag stops any running inertia before moving.
    pub fn drag(&mut self, point: DVec2) {
        self.stop_deceleration();
        self.handle_translation(point);
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn set_friction(&mut self, friction: f64) {
        self.friction = friction.clamp(0.0, MAX_FRICTION);
    }

    /// Starts inertia with the release velocity of a drag, in points per second.
    pub fn start_deceleration(&mut self, velocity: DVec2) {
        self.velocity = Some(velocity);
    }

    pub fn stop_deceleration(&mut self) {
        self.velocity = None;
    }

    pub fn is_decelerating(&self) -> bool {
        self.velocity.is_some()
    }

    /// Advances inertia by `dt` seconds. Returns `true` while it is still running.
    pub fn tick_deceleration(&mut self, dt: f64) -> bool {
        let Some(mut velocity) = self.velocity else {
            return false;
        };
        velocity *= self.friction;

        let (moved_pitch, moved_yaw) = self.handle_translation(velocity * dt);
        if !moved_yaw {
            velocity.x = 0.0;
        }
        if !moved_pitch {
            velocity.y = 0.0;
        }

        if velocity.x.abs() < VELOCITY_EPSILON && velocity.y.abs() < VELOCITY_EPSILON {
            self.velocity = None;
            return false;
        }
        self.velocity = Some(velocity);
        true
    }

    /// Pinch in progress; `factor` is relative to the scale at gesture start.
    pub fn pinch_changed(&mut self, factor: f64) {
        self.scale = (self.last_scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn pinch_ended(&mut self) {
        self.last_scale = self.scale;
    }

    /// Zeroes both rotations, the zoom and the gyro reference.
    pub fn recenter(&mut self) {
        self.set_rotation(Axis::Pitch, 0.0);
        self.set_rotation(Axis::Yaw, 0.0);
        self.gyro.initial = None;
        self.scale = 1.0;
        self.last_scale = 1.0;
    }

    pub fn set_gyroscope_enabled(&mut self, enabled: bool) {
        if self.gyro.enabled != enabled {
            log::debug!("gyroscope {}", if enabled { "on" } else { "off" });
        }
        self.gyro.enabled = enabled;
        if !enabled {
            self.gyro.latest = None;
        }
        self.recenter();
    }

    pub fn gyroscope_enabled(&self) -> bool {
        self.gyro.enabled
    }

    pub fn set_device_orientation(&mut self, device: DeviceOrientation) {
        self.device = device;
    }

    pub fn update_attitude(&mut self, attitude: Attitude) {
        if self.gyro.enabled {
            self.gyro.latest = Some(attitude);
        }
    }

    /// The gyro only contributes once at least one video frame was shown.
    pub fn mark_frame_received(&mut self) {
        self.has_frame = true;
    }

    /// View matrix for the current finger, zoom and gyro state.
    pub fn view_matrix(&mut self) -> Mat4 {
        let scale = self.scale as f32;
        let mut sensor = Mat4::from_scale(Vec3::new(scale, scale, 1.0));

        let relative = if self.gyro.enabled && self.has_frame {
            self.gyro.relative()
        } else {
            None
        };
        if let Some(relative) = relative {
            let roll = match self.device {
                DeviceOrientation::LandscapeLeft => 1.0,
                DeviceOrientation::LandscapeRight => -1.0,
            } * std::f32::consts::FRAC_PI_2;

            sensor *= Mat4::from_quat(relative);
            sensor = Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2) * sensor;
            sensor = Mat4::from_rotation_z(roll) * sensor;
            if self.gyro.initially_portrait {
                sensor = Mat4::from_rotation_z(roll) * sensor;
            }
            sensor = Mat4::from_rotation_y(std::f32::consts::PI) * sensor;
        }

        let yaw = Mat4::from_rotation_y(self.rotation_y as f32);
        let pitch = Mat4::from_rotation_x(self.rotation_x as f32);
        pitch * (sensor * yaw)
    }
}

/// Perspective for a horizontal field of view on the fixed 1280x720 video aspect.
pub fn projection_matrix(field_of_view_radians: f32) -> Mat4 {
    Mat4::perspective_rh(
        field_of_view_radians / VIDEO_ASPECT,
        VIDEO_ASPECT,
        NEAR_Z,
        FAR_Z,
    )
}
