use super::{effective_fps, VideoSource};
use crate::error::PipelineError;
use anyhow::Result;
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{
        VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
        CAP_PROP_FRAME_WIDTH,
    },
};

pub struct OpencvReader {
    capture: VideoCapture,
    fps: f64,
    size: Size,
    total_frames: Option<u64>,
}

impl OpencvReader {
    /// Opens `path`, failing with [`PipelineError::Open`] for missing,
    /// corrupt or unsupported files.
    pub fn open(path: &str) -> Result<Self, PipelineError> {
        let open_err = |reason: String| PipelineError::Open {
            path: path.to_string(),
            reason,
        };

        let capture =
            VideoCapture::from_file(path, CAP_ANY).map_err(|e| open_err(e.to_string()))?;
        if !capture.is_opened().map_err(|e| open_err(e.to_string()))? {
            return Err(open_err("no backend could read the file".to_string()));
        }

        let prop = |id: i32| capture.get(id).map_err(|e| open_err(e.to_string()));

        let reported_fps = prop(CAP_PROP_FPS)?;
        let fps = effective_fps(reported_fps);
        if fps != reported_fps {
            tracing::warn!(
                "OpencvReader: {} reports fps={}, assuming {:.1}",
                path,
                reported_fps,
                fps
            );
        }

        let size = Size::new(
            prop(CAP_PROP_FRAME_WIDTH)? as i32,
            prop(CAP_PROP_FRAME_HEIGHT)? as i32,
        );
        if size.width <= 0 || size.height <= 0 {
            return Err(open_err(format!(
                "invalid frame size {}x{}",
                size.width, size.height
            )));
        }

        let raw_count = prop(CAP_PROP_FRAME_COUNT)?;
        let total_frames = (raw_count > 0.0).then_some(raw_count as u64);

        tracing::info!(
            "OpencvReader: opened {}, {}x{}, fps={:.2}, stream_frames={:?}",
            path,
            size.width,
            size.height,
            fps,
            total_frames
        );

        Ok(Self {
            capture,
            fps,
            size,
            total_frames,
        })
    }
}

impl VideoSource for OpencvReader {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_size(&self) -> Size {
        self.size
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.total_frames
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let success = self.capture.read(&mut frame)?;
        if !success || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for OpencvReader {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::warn!("OpencvReader: failed to release capture: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        let path = std::env::temp_dir().join("dance-skeleton-missing-input.mp4");
        let result = OpencvReader::open(path.to_str().unwrap());
        assert!(matches!(result, Err(PipelineError::Open { .. })));
    }

    #[test]
    fn test_open_corrupt_file() {
        let path = std::env::temp_dir().join(format!(
            "dance-skeleton-corrupt-{}.mp4",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, b"definitely not a video container").unwrap();
        let result = OpencvReader::open(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(PipelineError::Open { .. })));
    }
}
