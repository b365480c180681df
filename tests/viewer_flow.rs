use std::f64::consts::PI;
use std::io::Write;

use glam::{DVec2, Mat4};
use tempfile::NamedTempFile;

use ybvr_viewer::layout::ControlRoomV2Layout;
use ybvr_viewer::{
    Controller, Error, GeometryKind, Input, Signaling, SignalingVersion, VideoConfig,
};

const EPSILON: f32 = 1e-4;

const STADIUM: &str = r#"{
    "cameras": [
        {"name": "Rig", "id": 1, "geometries": "2"},
        {"name": "Bench", "id": 2, "geometries": "12"},
        {"name": "Goal", "id": 3, "geometries": "12,7"},
        {"name": "Wide", "id": 4, "geometries": "12"},
        {"name": "Tunnel", "id": 5, "geometries": "12"},
        {"name": "Crowd", "id": 6, "geometries": "12"}
    ],
    "camerasPresentation": {
        "controlRooms": [{"id": 1, "camIDs": "2,3,4,5,6"}]
    }
}"#;

fn stadium() -> (Controller, std::sync::mpsc::Receiver<ybvr_viewer::ViewportChange>) {
    let signaling = Signaling::from_json(STADIUM).unwrap();
    Controller::new(
        VideoConfig::default(),
        SignalingVersion::V2,
        false,
        Some(&signaling),
    )
}

#[test]
fn signaling_drives_the_geometry_set() {
    let (mut controller, _rx) = stadium();

    let ids: Vec<&str> = controller
        .scene()
        .meshes()
        .iter()
        .map(|mesh| mesh.kind.id())
        .collect();
    assert_eq!(ids, vec!["2", "12", "7"]);

    let frame = controller.frame(1.0 / 60.0);
    assert_eq!(frame.mvps.len(), controller.scene().draws().len());
    assert!(frame.mvps.iter().all(|mvp| *mvp != Mat4::IDENTITY));
}

#[test]
fn control_room_v2_sized_by_its_cameras() {
    let (controller, _rx) = stadium();
    let scene = controller.scene();

    // five v2 cameras need two rows of four
    let layout = scene.control_room_layout();
    assert_eq!(layout, ControlRoomV2Layout::new(2).unwrap());
    let frame_height = layout.frame_height();
    assert_eq!(frame_height, 1672.0);

    let mesh = scene
        .meshes()
        .iter()
        .find(|mesh| matches!(mesh.kind, GeometryKind::ControlRoomV2(_)))
        .unwrap();
    let top = mesh.vertices.iter().map(|v| v.uv[1]).fold(f32::MAX, f32::min);
    let split = mesh.vertices.iter().map(|v| v.uv[1]).fold(f32::MIN, f32::max);
    assert!((top - 16.0 / frame_height).abs() < EPSILON);
    assert!((split - 1080.0 / (1080.0 + 32.0 + 560.0)).abs() < EPSILON);

    let rects = scene.thumbnail_uv_rects(1952.0, frame_height, 5);
    assert_eq!(rects.len(), 5);
    // first thumbnail row starts right under the main video
    assert!((rects[0].y - (16.0 + 1080.0 + 16.0) / frame_height).abs() < EPSILON);
    assert!((rects[4].y - rects[0].y - (264.0 + 16.0) / frame_height).abs() < EPSILON);
}

#[test]
fn looking_around_reports_gaze_viewports() {
    let (mut controller, rx) = stadium();

    controller.frame(0.0);
    assert_eq!(controller.viewport(), 4);
    rx.try_iter().for_each(drop);

    controller.push(Input::Rotate(PI / 2.0));
    controller.frame(0.0);
    assert_eq!(controller.viewport(), 0);

    let change = rx.try_recv().unwrap();
    assert_eq!((change.start_viewport, change.end_viewport), (4, 0));
    assert!(!change.is_cam_change);
}

#[test]
fn released_drag_glides_to_a_stop() {
    let (mut controller, _rx) = stadium();

    controller.push(Input::Drag(DVec2::new(10.0, 0.0)));
    controller.push(Input::DragEnded(DVec2::new(300.0, 0.0)));
    controller.frame(1.0 / 60.0);
    let after_drag = controller.orientation().yaw();
    assert!(after_drag < 0.0);

    let mut frames = 0;
    while controller.orientation().is_decelerating() {
        controller.frame(1.0 / 60.0);
        frames += 1;
        assert!(frames < 2_000, "inertia never settled");
    }
    let settled = controller.orientation().yaw();
    assert!(settled < after_drag);
    assert!(settled > -PI && settled <= PI);

    // a new drag starts from where inertia stopped
    controller.push(Input::Drag(DVec2::ZERO));
    controller.frame(1.0 / 60.0);
    assert_eq!(controller.orientation().yaw(), settled);
}

#[test]
fn documents_load_from_disk() {
    let mut signaling_file = NamedTempFile::new().unwrap();
    signaling_file.write_all(STADIUM.as_bytes()).unwrap();
    let signaling = Signaling::load(signaling_file.path(), false).unwrap();
    assert_eq!(signaling.cameras.len(), 6);

    let mut config_file = NamedTempFile::new().unwrap();
    config_file
        .write_all(br#"{"geometryFieldOfView": 90, "pendingCameraWarnMs": 3000}"#)
        .unwrap();
    let config = VideoConfig::load(config_file.path()).unwrap();
    assert_eq!(config.geometry_field_of_view, 90.0);
    assert_eq!(config.pending_camera_warn_ms, Some(3_000));
    assert_eq!(config.max_buffer_duration, 5.0);

    let missing = signaling_file.path().with_extension("missing");
    assert!(matches!(
        Signaling::load(&missing, false),
        Err(Error::Io { .. })
    ));
}

#[test]
fn no_signaling_sphere_starts_centered() {
    let (mut controller, _rx) = Controller::new(
        VideoConfig::default(),
        SignalingVersion::NsEquirectangularMono,
        false,
        None,
    );
    assert!(controller.cameras().is_empty());
    assert_eq!(controller.scene().meshes()[0].kind, GeometryKind::Sphere);

    controller.select_next_camera();
    let frame = controller.frame(0.0);
    assert_eq!(frame.mvps.len(), 1);
    assert_eq!(controller.orientation().yaw(), 0.0);
}
