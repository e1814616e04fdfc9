use opencv::core::Mat;
use opencv::prelude::*;
use serde::Serialize;

/// Keypoints at or below this visibility are not drawn.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// A single body landmark in normalized coordinates [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Detector confidence (0.0-1.0)
    pub visibility: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility > VISIBILITY_THRESHOLD
    }

    /// Pixel position for a frame of the given size.
    pub fn to_pixel(&self, width: i32, height: i32) -> (i32, i32) {
        (
            (self.x * width as f32).round() as i32,
            (self.y * height as f32).round() as i32,
        )
    }
}

/// Pair of keypoint indices joined by a bone.
pub type Edge = (usize, usize);

/// Shape of a BGR frame: rows, columns and OpenCV element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDims {
    pub height: i32,
    pub width: i32,
    pub typ: i32,
}

impl FrameDims {
    pub fn of(frame: &Mat) -> Self {
        Self {
            height: frame.rows(),
            width: frame.cols(),
            typ: frame.typ(),
        }
    }

    #[cfg(test)]
    pub fn bgr(height: i32, width: i32) -> Self {
        Self {
            height,
            width,
            typ: opencv::core::CV_8UC3,
        }
    }
}

/// Summary of one processed video, returned to the client as `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingResult {
    #[serde(rename = "frames")]
    pub frame_count: usize,
    /// Frames where the detector returned at least one keypoint
    #[serde(rename = "processed_frames")]
    pub processed_frame_count: usize,
    pub fps: f64,
    #[serde(rename = "width")]
    pub output_width: i32,
    #[serde(rename = "height")]
    pub output_height: i32,
}
