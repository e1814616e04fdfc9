use super::VideoSink;
use crate::cli::FourCc;
use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::VideoWriter,
};

pub struct OpencvWriter {
    writer: VideoWriter,
    path: String,
    size: Size,
    released: bool,
}

impl OpencvWriter {
    pub fn create(path: &str, codec: FourCc, fps: f64, size: Size) -> Result<Self> {
        let [c1, c2, c3, c4] = codec.0;
        let fourcc = VideoWriter::fourcc(c1, c2, c3, c4)?;
        let writer = VideoWriter::new(path, fourcc, fps, size, true)
            .with_context(|| format!("Failed to create video writer at '{}'", path))?;
        if !writer.is_opened()? {
            return Err(anyhow!(
                "Video writer for '{}' did not open (codec '{}' unavailable?)",
                path,
                codec
            ));
        }

        tracing::info!(
            "OpencvWriter: writing {} at {}x{}, fps={:.2}, codec={}",
            path,
            size.width,
            size.height,
            fps,
            codec
        );

        Ok(Self {
            writer,
            path: path.to_string(),
            size,
            released: false,
        })
    }
}

impl VideoSink for OpencvWriter {
    fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        let frame_size = frame.size()?;
        if frame_size != self.size {
            return Err(anyhow!(
                "Frame size {}x{} does not match output {}x{}",
                frame_size.width,
                frame_size.height,
                self.size.width,
                self.size.height
            ));
        }
        self.writer.write(frame)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.writer
                .release()
                .with_context(|| format!("Failed to finalize '{}'", self.path))?;
        }
        Ok(())
    }
}

impl Drop for OpencvWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!("OpencvWriter: {:#}", e);
        }
    }
}

/// Writes `frames` solid-gray frames of `size` to an mp4v clip at `path`.
#[cfg(test)]
pub(crate) fn write_test_clip(path: &std::path::Path, frames: usize, size: Size) -> Result<()> {
    use opencv::core::{Scalar, CV_8UC3};

    let codec: FourCc = "mp4v".parse().map_err(|e: String| anyhow!(e))?;
    let mut writer = OpencvWriter::create(&path.to_string_lossy(), codec, 25.0, size)?;
    for i in 0..frames {
        let frame = Mat::new_rows_cols_with_default(
            size.height,
            size.width,
            CV_8UC3,
            Scalar::all((i * 20 + 40) as f64),
        )?;
        writer.write_frame(&frame)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::opencv_reader::OpencvReader;
    use crate::video::VideoSource;
    use opencv::core::{Scalar, CV_8UC3};
    use std::path::PathBuf;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dance-skeleton-{}-{}", uuid::Uuid::new_v4(), name))
    }

    #[test]
    fn test_clip_reads_back() {
        let path = scratch_file("clip.mp4");
        write_test_clip(&path, 6, Size::new(96, 64)).unwrap();

        let mut reader = OpencvReader::open(path.to_str().unwrap()).unwrap();
        assert_eq!(reader.frame_size(), Size::new(96, 64));
        let mut frames = 0;
        while reader.next_frame().unwrap().is_some() {
            frames += 1;
        }
        assert_eq!(frames, 6);

        drop(reader);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_rejects_mismatched_frame_size() {
        let path = scratch_file("mismatch.mp4");
        let mut writer = OpencvWriter::create(
            path.to_str().unwrap(),
            "mp4v".parse().unwrap(),
            25.0,
            Size::new(96, 64),
        )
        .unwrap();

        let wrong = Mat::new_rows_cols_with_default(64, 48, CV_8UC3, Scalar::all(0.0)).unwrap();
        let err = writer.write_frame(&wrong).unwrap_err();
        assert!(err.to_string().contains("48x64 does not match output 96x64"));

        let right = Mat::new_rows_cols_with_default(64, 96, CV_8UC3, Scalar::all(0.0)).unwrap();
        writer.write_frame(&right).unwrap();

        drop(writer);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_finish_is_idempotent() {
        let path = scratch_file("finish.mp4");
        let mut writer = OpencvWriter::create(
            path.to_str().unwrap(),
            "mp4v".parse().unwrap(),
            25.0,
            Size::new(32, 32),
        )
        .unwrap();

        writer.finish().unwrap();
        writer.finish().unwrap();
        assert!(writer.released);

        drop(writer);
        let _ = std::fs::remove_file(&path);
    }
}
