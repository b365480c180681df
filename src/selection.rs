// selection.rs - active/pending camera bookkeeping and change events

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::camera::Camera;

/// Milliseconds since the Unix epoch.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// A viewport or camera transition, as handed to analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportChange {
    pub start_viewport: i32,
    pub end_viewport: i32,
    #[serde(rename = "startTS")]
    pub start_ts: i64,
    #[serde(rename = "endTS")]
    pub end_ts: i64,
    pub change_time: i64,
    pub is_cam_change: bool,
}

impl ViewportChange {
    pub fn new(start_viewport: i32, end_viewport: i32, start_ts: i64, end_ts: i64) -> Self {
        Self {
            start_viewport,
            end_viewport,
            start_ts,
            end_ts,
            change_time: end_ts - start_ts,
            is_cam_change: true,
        }
    }

    pub fn with_cam_change(mut self, is_cam_change: bool) -> Self {
        self.is_cam_change = is_cam_change;
        self
    }
}

/// What the owner has to do after the playback side reported a live stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyOutcome {
    pub gyroscope: bool,
    /// Set when the pending camera was promoted; orientation must be recentered.
    pub change: Option<ViewportChange>,
}

/// Current and pending camera.
///
/// A selection only becomes current once the playback side confirms the new
/// stream is live, except for the very first selection which applies at once.
#[derive(Debug, Default, Clone)]
pub struct CameraSelection {
    current: Option<Camera>,
    pending: Option<Camera>,
    change_timestamp: i64,
}

impl CameraSelection {
    pub fn new(initial: Option<Camera>) -> Self {
        Self {
            pending: initial.clone(),
            current: initial,
            change_timestamp: 0,
        }
    }

    pub fn current(&self) -> Option<&Camera> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> Option<&Camera> {
        self.pending.as_ref()
    }

    pub fn change_timestamp(&self) -> i64 {
        self.change_timestamp
    }

    /// Timestamp of the selection still waiting for its stream, if any.
    pub fn pending_since(&self) -> Option<i64> {
        match (&self.current, &self.pending) {
            (Some(current), Some(pending)) if current.id != pending.id => {
                Some(self.change_timestamp)
            }
            _ => None,
        }
    }

    /// Records a new selection. Returns `true` when it became current immediately,
    /// in which case the owner recenters the orientation.
    pub fn select(&mut self, camera: Camera, now: i64) -> bool {
        self.change_timestamp = now;
        self.pending = Some(camera.clone());
        if self.current.is_none() {
            log::info!("camera {} ({}) active", camera.id, camera.displayable_name());
            self.current = Some(camera);
            return true;
        }
        false
    }

    pub fn on_video_ready(&mut self, now: i64) -> ReadyOutcome {
        let gyroscope = self
            .pending
            .as_ref()
            .is_some_and(|pending| !pending.is_flat_camera());

        let Some(pending) = self.pending.as_ref() else {
            return ReadyOutcome {
                gyroscope,
                change: None,
            };
        };
        let current_id = self.current.as_ref().map(|c| c.id);
        if current_id == Some(pending.id) || self.change_timestamp == 0 {
            return ReadyOutcome {
                gyroscope,
                change: None,
            };
        }

        let change = ViewportChange::new(
            current_id.unwrap_or(0),
            pending.id,
            self.change_timestamp,
            now,
        );
        log::info!(
            "camera {} -> {} after {} ms",
            change.start_viewport,
            change.end_viewport,
            change.change_time
        );
        self.current = Some(pending.clone());
        ReadyOutcome {
            gyroscope,
            change: Some(change),
        }
    }
}
