pub mod opencv_reader;
pub mod opencv_writer;
pub mod processor;

use anyhow::Result;
use opencv::core::{Mat, Size};

/// Fallback when the container reports no usable frame rate. This is a guess
/// kept for compatibility with earlier outputs, not a measured value.
pub const DEFAULT_FPS: f64 = 25.0;

pub trait VideoSource {
    fn fps(&self) -> f64;
    fn frame_size(&self) -> Size;
    /// Frame count from container metadata; only used for progress display.
    fn frame_count_hint(&self) -> Option<u64>;
    /// Next frame in file order, `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Mat>>;
}

pub trait VideoSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()>;
    /// Flushes and closes the output. Dropping a sink also releases it.
    fn finish(&mut self) -> Result<()>;
}

/// Replaces missing, zero, negative or NaN rates with [`DEFAULT_FPS`].
pub fn effective_fps(reported: f64) -> f64 {
    if reported.is_finite() && reported > 0.0 {
        reported
    } else {
        DEFAULT_FPS
    }
}
