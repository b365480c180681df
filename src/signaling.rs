// signaling.rs - stream signaling documents (cameras, viewpoints, control rooms)
//
// Decoding is forgiving the same way the streaming backend expects: optional
// blocks that fail to decode are dropped instead of failing the whole document.
// Only a syntactically broken document, or a V3 document without its camera
// list, is an error.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::camera::{parse_geometry_list, Camera, ViewportMatrix};
use crate::error::{Error, Result};
use crate::layout::ControlRoomV2Layout;
use crate::mesh::GeometryKind;

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Component {
    Number(f32),
    Text(String),
}

fn component<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Component::deserialize(deserializer)? {
        Component::Number(value) => value,
        Component::Text(text) => text.trim().parse().unwrap_or(0.0),
    })
}

/// Components arrive either as numbers or as numeric strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Vector3 {
    #[serde(deserialize_with = "component")]
    pub x: f32,
    #[serde(deserialize_with = "component")]
    pub y: f32,
    #[serde(deserialize_with = "component")]
    pub z: f32,
}

impl From<Vector3> for glam::Vec3 {
    fn from(v: Vector3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ControlRoomSettings {
    #[serde(default, deserialize_with = "lenient")]
    pub side: Option<f32>,
    #[serde(default, deserialize_with = "lenient")]
    pub offset: Option<Vector3>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPoint {
    pub name: Option<String>,
    pub sorting_index: Option<i64>,
    #[serde(rename = "controlRoomID")]
    pub control_room_id: Option<i32>,
    #[serde(rename = "camID")]
    pub cam_id: Option<i32>,
    pub is_enabled: Option<bool>,
    pub icon_text: Option<String>,
    #[serde(rename = "iconURL")]
    pub icon_url: Option<String>,
    #[serde(rename = "mobileIconURL")]
    pub mobile_icon_url: Option<String>,
    #[serde(rename = "highlightedIconURL")]
    pub highlighted_icon_url: Option<String>,
    #[serde(rename = "selectedIconURL")]
    pub selected_icon_url: Option<String>,
    #[serde(rename = "mobileSelectedIconURL")]
    pub mobile_selected_icon_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub position: Option<Vector3>,
    #[serde(default, deserialize_with = "lenient")]
    pub rotation: Option<Vector3>,
    pub scale: Option<String>,
}

impl ViewPoint {
    /// Returned by lookups that find nothing.
    pub fn empty() -> Self {
        Self {
            is_enabled: Some(true),
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> &str {
        self.icon_text.as_deref().unwrap_or(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRoom {
    pub id: i32,
    pub name: Option<String>,
    pub map_label: Option<String>,
    pub is_enabled: Option<bool>,
    pub map_poster: Option<String>,
    pub mobile_map_poster: Option<String>,
    pub map_poster_background: Option<String>,
    pub mobile_map_poster_background: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub position_offset: Option<Vector3>,
    #[serde(default, deserialize_with = "lenient")]
    pub rotation_offset: Option<Vector3>,
    pub scale: Option<i64>,
    #[serde(rename = "readyIconURL")]
    pub ready_icon_url: Option<String>,
    #[serde(rename = "highlightedIconURL")]
    pub highlighted_icon_url: Option<String>,
    #[serde(rename = "changingIconURL")]
    pub changing_icon_url: Option<String>,
    #[serde(rename = "changedIconURL")]
    pub changed_icon_url: Option<String>,
    #[serde(rename = "camIDs")]
    pub cam_ids: Option<String>,
}

impl ControlRoom {
    /// Camera ids in CSV order. Entries that are not integers read as 0.
    pub fn cam_ids_list(&self) -> Vec<i32> {
        self.cam_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter(|id| !id.is_empty())
            .map(|id| id.trim().parse().unwrap_or(0))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPresentation {
    pub is_enabled: Option<bool>,
    pub map_label: Option<String>,
    pub map_poster: Option<String>,
    pub mobile_map_poster: Option<String>,
    pub map_poster_background: Option<String>,
    pub mobile_map_poster_background: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub control_room_settings: Option<ControlRoomSettings>,
    #[serde(default, deserialize_with = "lenient")]
    pub position_offset: Option<Vector3>,
    #[serde(default, deserialize_with = "lenient")]
    pub rotation_offset: Option<Vector3>,
    pub scale: Option<i64>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub view_points: Vec<ViewPoint>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub control_rooms: Vec<ControlRoom>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepresentationId {
    pub id: String,
}

/// Legacy per-stream viewport description.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Viewport {
    pub yaw: Option<String>,
    pub pitch: Option<String>,
    pub roll: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub representations: Vec<RepresentationId>,
}

impl Viewport {
    pub fn representation_ids(&self) -> Vec<&str> {
        self.representations.iter().map(|r| r.id.as_str()).collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CameraRecord {
    name: String,
    id: i32,
    geometries: Option<String>,
    viewport_offset: Option<String>,
    hls_name: Option<String>,
    comment: Option<String>,
    url: Option<String>,
}

impl From<CameraRecord> for Camera {
    fn from(record: CameraRecord) -> Self {
        Camera {
            name: record.name,
            id: record.id,
            geometries: parse_geometry_list(record.geometries.as_deref()),
            viewport_offset: record.viewport_offset,
            hls_name: record.hls_name,
            comment: record.comment,
            base_url: record.url,
            viewport_matrix: None,
            is_v3: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CameraV3Record {
    name: String,
    id: i32,
    geometries: Option<String>,
    viewport_matrix: ViewportMatrix,
    base_url: Option<String>,
    comment: Option<String>,
}

impl From<CameraV3Record> for Camera {
    fn from(record: CameraV3Record) -> Self {
        Camera {
            name: record.name,
            id: record.id,
            geometries: parse_geometry_list(record.geometries.as_deref()),
            viewport_offset: None,
            hls_name: None,
            comment: record.comment,
            base_url: record.base_url,
            viewport_matrix: Some(record.viewport_matrix),
            is_v3: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalingRecord {
    #[serde(default, deserialize_with = "lenient_list")]
    viewports: Vec<Viewport>,
    #[serde(default, deserialize_with = "lenient_list")]
    cameras: Vec<CameraRecord>,
    #[serde(default, deserialize_with = "lenient")]
    cameras_presentation: Option<CameraPresentation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalingV3Record {
    cameras: Vec<CameraV3Record>,
    #[serde(default, deserialize_with = "lenient")]
    cameras_presentation: Option<CameraPresentation>,
}

/// Labels and posters for the camera map, preferring the mobile variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalingUiData {
    pub map_label: Option<String>,
    pub control_room_label: Option<String>,
    pub map_poster: Option<String>,
    pub map_poster_background: Option<String>,
    pub control_room_poster: Option<String>,
    pub control_room_background: Option<String>,
}

/// A decoded signaling document of either generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signaling {
    pub viewports: Vec<Viewport>,
    pub cameras: Vec<Camera>,
    pub presentation: Option<CameraPresentation>,
    pub is_v3: bool,
}

impl Signaling {
    /// Decodes a V1/V2 document.
    pub fn from_json(text: &str) -> Result<Self> {
        let record: SignalingRecord = serde_json::from_str(text).map_err(Error::Signaling)?;
        Ok(Self {
            viewports: record.viewports,
            cameras: record.cameras.into_iter().map(Camera::from).collect(),
            presentation: record.cameras_presentation,
            is_v3: false,
        })
    }

    /// Decodes a V3 document (cameras carry a viewport matrix and base URL).
    pub fn from_json_v3(text: &str) -> Result<Self> {
        let record: SignalingV3Record =
            serde_json::from_str(text).map_err(Error::Signaling)?;
        Ok(Self {
            viewports: Vec::new(),
            cameras: record.cameras.into_iter().map(Camera::from).collect(),
            presentation: record.cameras_presentation,
            is_v3: true,
        })
    }

    pub fn load(path: impl AsRef<Path>, v3: bool) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        let signaling = if v3 {
            Self::from_json_v3(&text)?
        } else {
            Self::from_json(&text)?
        };
        log::info!(
            "loaded signaling {} ({} cameras)",
            path.display(),
            signaling.cameras.len()
        );
        Ok(signaling)
    }

    /// Every geometry id of every camera, in document order (duplicates kept).
    pub fn all_geometries(&self) -> Vec<String> {
        self.cameras
            .iter()
            .flat_map(|camera| camera.geometries.iter().cloned())
            .collect()
    }

    /// Cameras listed by the first control room, in its `camIDs` order.
    pub fn control_room_cameras(&self) -> Vec<&Camera> {
        let Some(room) = self
            .presentation
            .as_ref()
            .and_then(|p| p.control_rooms.first())
        else {
            return Vec::new();
        };
        room.cam_ids_list()
            .into_iter()
            .filter_map(|id| self.camera(id))
            .collect()
    }

    /// Thumbnail rows a v2 control room needs: one per four v2 cameras.
    pub fn number_of_rows_for_crv2(&self) -> u32 {
        let count = self
            .control_room_cameras()
            .iter()
            .filter(|camera| camera.has_geometry(GeometryKind::CONTROL_ROOM_V2_ID))
            .count();
        ControlRoomV2Layout::rows_for_cameras(count)
    }

    pub fn is_single_cam(&self) -> bool {
        self.presentation.is_none() && self.cameras.len() == 1
    }

    pub fn camera(&self, id: i32) -> Option<&Camera> {
        self.cameras.iter().find(|camera| camera.id == id)
    }

    pub fn view_points(&self) -> &[ViewPoint] {
        self.presentation
            .as_ref()
            .map(|p| p.view_points.as_slice())
            .unwrap_or_default()
    }

    pub fn camera_for_view_point(&self, view_point: &ViewPoint) -> Option<&Camera> {
        self.camera(view_point.cam_id?)
    }

    /// The viewpoint bound to `camera`, or `ViewPoint::empty()` for single-camera
    /// streams and cameras without one.
    pub fn view_point_for_camera(&self, camera: &Camera) -> ViewPoint {
        if self.is_single_cam() {
            return ViewPoint::empty();
        }
        self.view_points()
            .iter()
            .find(|vp| vp.cam_id == Some(camera.id))
            .cloned()
            .unwrap_or_else(ViewPoint::empty)
    }

    pub fn ui_data(&self) -> SignalingUiData {
        let Some(p) = &self.presentation else {
            return SignalingUiData::default();
        };
        let room = p.control_rooms.first();
        let prefer = |mobile: &Option<String>, desktop: &Option<String>| {
            mobile.clone().or_else(|| desktop.clone())
        };
        SignalingUiData {
            map_label: p.map_label.clone(),
            control_room_label: room.and_then(|r| r.map_label.clone()),
            map_poster: prefer(&p.mobile_map_poster, &p.map_poster),
            map_poster_background: prefer(
                &p.mobile_map_poster_background,
                &p.map_poster_background,
            ),
            control_room_poster: room.and_then(|r| prefer(&r.mobile_map_poster, &r.map_poster)),
            control_room_background: room.and_then(|r| {
                prefer(&r.mobile_map_poster_background, &r.map_poster_background)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROL_ROOM_DOC: &str = r#"{
        "viewports": [{"yaw": "0", "representations": [{"id": "v0"}]}],
        "cameras": [
            {"name": "Main", "id": 1, "geometries": "2", "url": "https://cdn.example/main.m3u8"},
            {"name": "Bench", "id": 2, "geometries": "12"},
            {"name": "Goal", "id": 3, "geometries": "12,7"},
            {"name": "Wide", "id": 4, "geometries": "12"},
            {"name": "Tunnel", "id": 5, "geometries": "12"},
            {"name": "Crowd", "id": 6, "geometries": "12"}
        ],
        "camerasPresentation": {
            "mapLabel": "Stadium",
            "mapPoster": "desk.png",
            "mobileMapPoster": "mobile.png",
            "positionOffset": {"x": "1.5", "y": 2, "z": "oops"},
            "viewPoints": [
                {"name": "vp-main", "camID": 1, "iconText": "Main"},
                {"name": "vp-goal", "camID": 3}
            ],
            "controlRooms": [
                {"id": 9, "mapLabel": "CR", "camIDs": "2,3,4,5,6,42"}
            ]
        }
    }"#;

    #[test]
    fn decodes_cameras_and_presentation() {
        let signaling = Signaling::from_json(CONTROL_ROOM_DOC).unwrap();
        assert_eq!(signaling.cameras.len(), 6);
        assert!(!signaling.is_v3);
        assert_eq!(signaling.viewports[0].representation_ids(), vec!["v0"]);

        let main = signaling.camera(1).unwrap();
        assert_eq!(main.base_url.as_deref(), Some("https://cdn.example/main.m3u8"));
        assert_eq!(signaling.camera(3).unwrap().geometries, vec!["12", "7"]);

        let p = signaling.presentation.as_ref().unwrap();
        assert_eq!(
            p.position_offset,
            Some(Vector3 {
                x: 1.5,
                y: 2.0,
                z: 0.0
            })
        );
    }

    #[test]
    fn control_room_queries() {
        let signaling = Signaling::from_json(CONTROL_ROOM_DOC).unwrap();
        let ids: Vec<i32> = signaling.control_room_cameras().iter().map(|c| c.id).collect();
        // 42 is not a camera of this stream
        assert_eq!(ids, vec![2, 3, 4, 5, 6]);
        assert_eq!(signaling.number_of_rows_for_crv2(), 2);
        assert!(!signaling.is_single_cam());
        assert_eq!(signaling.all_geometries().len(), 7);
    }

    #[test]
    fn view_point_lookups() {
        let signaling = Signaling::from_json(CONTROL_ROOM_DOC).unwrap();
        let vp = signaling.view_point_for_camera(signaling.camera(1).unwrap());
        assert_eq!(vp.display_name(), "Main");
        assert_eq!(signaling.camera_for_view_point(&vp).map(|c| c.id), Some(1));

        let missing = signaling.view_point_for_camera(signaling.camera(4).unwrap());
        assert_eq!(missing, ViewPoint::empty());
        assert!(signaling.camera_for_view_point(&missing).is_none());
    }

    #[test]
    fn ui_data_prefers_mobile_posters() {
        let ui = Signaling::from_json(CONTROL_ROOM_DOC).unwrap().ui_data();
        assert_eq!(ui.map_poster.as_deref(), Some("mobile.png"));
        assert_eq!(ui.control_room_label.as_deref(), Some("CR"));
        assert_eq!(ui.control_room_poster, None);
    }

    #[test]
    fn broken_optional_blocks_are_dropped() {
        let text = r#"{
            "cameras": [{"name": "Solo", "id": 7, "geometries": "1"}],
            "camerasPresentation": "not an object"
        }"#;
        let signaling = Signaling::from_json(text).unwrap();
        assert!(signaling.presentation.is_none());
        assert!(signaling.is_single_cam());
        assert_eq!(
            signaling.view_point_for_camera(&signaling.cameras[0]),
            ViewPoint::empty()
        );
    }

    #[test]
    fn v2_camera_list_of_the_wrong_shape_is_empty() {
        let signaling = Signaling::from_json(r#"{"cameras": {"id": 1}}"#).unwrap();
        assert!(signaling.cameras.is_empty());

        // one record without an id drops the whole list
        let text = r#"{"cameras": [{"name": "A", "id": 1}, {"name": "B"}]}"#;
        assert!(Signaling::from_json(text).unwrap().cameras.is_empty());
    }

    #[test]
    fn cam_ids_list_reads_garbage_as_zero() {
        let room: ControlRoom =
            serde_json::from_str(r#"{"id": 1, "camIDs": "4,x,6"}"#).unwrap();
        assert_eq!(room.cam_ids_list(), vec![4, 0, 6]);
    }

    #[test]
    fn v3_documents_require_cameras() {
        assert!(matches!(
            Signaling::from_json_v3("{}"),
            Err(Error::Signaling(_))
        ));

        let text = r#"{"cameras": [{
            "name": "Pitch", "id": 11, "geometries": "10",
            "baseUrl": "https://cdn.example/",
            "viewportMatrix": {"type": 1, "viewports": [
                {"representations": [{"bandwidth": 6000000, "stream": "hi.m3u8"}]}
            ]}
        }]}"#;
        let signaling = Signaling::from_json_v3(text).unwrap();
        let camera = &signaling.cameras[0];
        assert!(signaling.is_v3 && camera.is_v3);
        assert_eq!(camera.viewport_count(), 4);
        assert_eq!(camera.url(None).unwrap(), "https://cdn.example/hi.m3u8");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            Signaling::from_json("{"),
            Err(Error::Signaling(_))
        ));
    }
}
