// layout.rs - control room mosaic layouts and thumbnail cropping
//
// A control room frame packs the main video plus up to eight camera thumbnails.
// Rectangles produced here use a bottom-left origin (the GPU convention); call
// `Rect::to_top_left` before cropping a decoded image.

use crate::error::{Error, Result};

/// At most two rows of four thumbnails are ever cropped.
pub const MAX_THUMBNAILS: usize = 8;
const THUMBNAILS_PER_ROW: usize = 4;

/// Fixed ratios of the v1 control room frame (1312x1120).
pub struct RatiosV1;

impl RatiosV1 {
    pub const SMALL_WIDTH: f32 = 314.0 / 1312.0;
    pub const SMALL_HEIGHT: f32 = 176.0 / 1120.0;
    pub const BIG_WIDTH: f32 = 1280.0 / 1312.0;
    pub const BIG_HEIGHT: f32 = 720.0 / 1120.0;
    pub const INNER_MARGIN_HORIZONTAL: f32 = 8.0 / 1312.0;
    pub const INNER_MARGIN_VERTICAL: f32 = 8.0 / 1120.0;
    pub const EXT_MARGIN_HORIZONTAL: f32 = 16.0 / 1312.0;
    pub const EXT_MARGIN_VERTICAL: f32 = 16.0 / 1120.0;
    pub const VIDEO_RATIO: f32 = 1280.0 / 720.0;
    pub const SMALL_VIDEO_RATIO: f32 = 314.0 / 176.0;
}

const V2_FRAME_WIDTH: f32 = 1920.0 + 2.0 * 16.0;
const V2_PADDING: f32 = 16.0;
const V2_BIG_HEIGHT_PX: f32 = 1080.0;
const V2_SMALL_WIDTH_PX: f32 = 468.0;
const V2_SMALL_HEIGHT_PX: f32 = 264.0;
const NARROW_FRAME_WIDTH: f32 = 1920.0;

/// v2 control room frame: 1920x1080 main video over `rows` rows of thumbnails.
/// The vertical ratios depend on the row count, so the layout is passed explicitly
/// to every computation that needs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRoomV2Layout {
    rows: u32,
    inner_padding: f32,
}

impl ControlRoomV2Layout {
    pub const DEFAULT_INNER_PADDING: f32 = 16.0;
    pub const NARROW_INNER_PADDING: f32 = 8.0;

    pub fn new(rows: u32) -> Result<Self> {
        Self::with_inner_padding(rows, Self::DEFAULT_INNER_PADDING)
    }

    pub fn with_inner_padding(rows: u32, inner_padding: f32) -> Result<Self> {
        if rows == 0 {
            return Err(Error::InvalidRowCount(rows));
        }
        Ok(Self {
            rows,
            inner_padding,
        })
    }

    /// Like `new`, but a zero row count is raised to one row.
    pub fn clamped(rows: u32) -> Self {
        Self {
            rows: rows.max(1),
            inner_padding: Self::DEFAULT_INNER_PADDING,
        }
    }

    /// The same rows with the inner padding of a frame `frame_width` pixels wide:
    /// frames narrower than 1920 are packed with half the padding.
    pub fn for_frame_width(&self, frame_width: f32) -> Self {
        let inner_padding = if frame_width < NARROW_FRAME_WIDTH {
            Self::NARROW_INNER_PADDING
        } else {
            Self::DEFAULT_INNER_PADDING
        };
        Self {
            inner_padding,
            ..*self
        }
    }

    /// Row count for `camera_count` thumbnails: `ceil(count / 4)`.
    pub fn rows_for_cameras(camera_count: usize) -> u32 {
        camera_count.div_ceil(THUMBNAILS_PER_ROW) as u32
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Frame height in pixels.
    pub fn frame_height(&self) -> f32 {
        V2_BIG_HEIGHT_PX
            + 2.0 * V2_PADDING
            + self.rows as f32 * (V2_SMALL_HEIGHT_PX + self.inner_padding)
    }

    pub fn outer_padding_horizontal(&self) -> f32 {
        V2_PADDING / V2_FRAME_WIDTH
    }

    pub fn inner_padding_horizontal(&self) -> f32 {
        V2_PADDING / V2_FRAME_WIDTH
    }

    pub fn outer_padding_vertical(&self) -> f32 {
        self.inner_padding / self.frame_height()
    }

    pub fn inner_padding_vertical(&self) -> f32 {
        V2_PADDING / self.frame_height()
    }

    pub fn small_width(&self) -> f32 {
        V2_SMALL_WIDTH_PX / V2_FRAME_WIDTH
    }

    pub fn small_height(&self) -> f32 {
        V2_SMALL_HEIGHT_PX / self.frame_height()
    }

    pub fn big_width(&self) -> f32 {
        1920.0 / V2_FRAME_WIDTH
    }

    pub fn big_height(&self) -> f32 {
        V2_BIG_HEIGHT_PX / self.frame_height()
    }

    /// Fraction of the frame height taken by the main video, measured from the top.
    pub fn video_percentage(&self) -> f32 {
        self.big_height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MosaicLayout {
    V1,
    V2(ControlRoomV2Layout),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn normalized(&self, frame_width: f32, frame_height: f32) -> Rect {
        Rect {
            x: self.x / frame_width,
            y: self.y / frame_height,
            width: self.width / frame_width,
            height: self.height / frame_height,
        }
    }

    /// Re-expresses a bottom-left origin rectangle against a top-left origin.
    pub fn to_top_left(&self, frame_height: f32) -> Rect {
        Rect {
            y: frame_height - self.y - self.height,
            ..*self
        }
    }

    /// `[x, y, width, height]`, the shape the shaders take.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// Pixel rectangle of thumbnail `index` inside a decoded control room frame.
///
/// Returns `None` for indices past the eighth thumbnail and, for v2, for rows
/// the layout does not have.
pub fn thumbnail_rect(
    index: usize,
    frame_width: f32,
    frame_height: f32,
    layout: &MosaicLayout,
) -> Option<Rect> {
    if index >= MAX_THUMBNAILS {
        return None;
    }
    let column = (index % THUMBNAILS_PER_ROW) as f32;
    let row = index / THUMBNAILS_PER_ROW;

    match layout {
        MosaicLayout::V1 => {
            let x = frame_width
                * (RatiosV1::EXT_MARGIN_HORIZONTAL
                    + column * (RatiosV1::SMALL_WIDTH + RatiosV1::INNER_MARGIN_HORIZONTAL));
            let y = if row == 0 {
                frame_height
                    * (RatiosV1::EXT_MARGIN_VERTICAL
                        + RatiosV1::SMALL_HEIGHT
                        + RatiosV1::INNER_MARGIN_VERTICAL * 2.0
                        + RatiosV1::BIG_HEIGHT)
            } else {
                frame_height * RatiosV1::EXT_MARGIN_VERTICAL
            };
            Some(Rect {
                x,
                y,
                width: frame_width * RatiosV1::SMALL_WIDTH,
                height: frame_height * RatiosV1::SMALL_HEIGHT,
            })
        }
        MosaicLayout::V2(v2) => {
            if row >= v2.rows() as usize {
                return None;
            }
            let x = frame_width
                * (v2.outer_padding_horizontal()
                    + column * (v2.small_width() + v2.inner_padding_horizontal()));
            let below = (row + 1) as f32;
            let y = frame_height
                - frame_height
                    * (v2.outer_padding_vertical()
                        + v2.big_height()
                        + below * v2.inner_padding_vertical()
                        + below * v2.small_height());
            Some(Rect {
                x,
                y,
                width: frame_width * v2.small_width(),
                height: frame_height * v2.small_height(),
            })
        }
    }
}
