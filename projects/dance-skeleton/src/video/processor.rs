use crate::cli::FourCc;
use crate::error::PipelineError;
use crate::pipeline::compose::{blank_like, compose_side_by_side};
use crate::pipeline::detection::PoseDetector;
use crate::pipeline::render::render_skeleton;
use crate::pipeline::types::{Edge, FrameDims, ProcessingResult};
use crate::video::opencv_reader::OpencvReader;
use crate::video::opencv_writer::OpencvWriter;
use crate::video::{VideoSink, VideoSource};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use opencv::core::{Mat, Size};
use std::time::Instant;

/// Builds the side-by-side frame for one source frame.
///
/// Returns the composite and whether the detector found anyone. When it did
/// not, the right half is left black and the renderer is not called.
pub fn process_frame(
    frame: &Mat,
    detector: &mut dyn PoseDetector,
    edges: &[Edge],
    width: i32,
) -> Result<(Mat, bool)> {
    let keypoints = detector.detect(frame).context("Pose detection failed")?;
    let detected = !keypoints.is_empty();

    let skeleton = if detected {
        render_skeleton(FrameDims::of(frame), &keypoints, edges)?
    } else {
        blank_like(frame)?
    };

    let combined = compose_side_by_side(frame, &skeleton, width)?;
    Ok((combined, detected))
}

fn progress_bar(total: Option<u64>) -> Result<ProgressBar> {
    let pb = match total {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1.yellow} fps, {eta})")?
                    .progress_chars("#>-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };
    Ok(pb)
}

/// Streams every frame of `source` through the detector into `sink`, in order.
///
/// The first failure aborts the loop; the caller owns cleanup of partial output.
pub fn run_pipeline(
    source: &mut dyn VideoSource,
    sink: &mut dyn VideoSink,
    detector: &mut dyn PoseDetector,
) -> Result<ProcessingResult, PipelineError> {
    let pb = progress_bar(source.frame_count_hint()).map_err(PipelineError::processing)?;
    run_with_progress(source, sink, detector, &pb)
}

fn run_with_progress(
    source: &mut dyn VideoSource,
    sink: &mut dyn VideoSink,
    detector: &mut dyn PoseDetector,
    pb: &ProgressBar,
) -> Result<ProcessingResult, PipelineError> {
    let size = source.frame_size();
    let fps = source.fps();
    let edges = detector.edges().to_vec();
    let start_time = Instant::now();

    let streamed = stream_frames(source, sink, detector, &edges, size.width, pb).and_then(
        |counts| {
            sink.finish().map_err(PipelineError::processing)?;
            Ok(counts)
        },
    );
    let (frame_count, processed_frame_count) = match streamed {
        Ok(counts) => counts,
        Err(e) => {
            pb.abandon_with_message("Failed");
            return Err(e);
        }
    };
    pb.finish_with_message("Done");

    tracing::info!(
        "Processed {} frames ({} with a pose) in {:.2}s",
        frame_count,
        processed_frame_count,
        start_time.elapsed().as_secs_f64()
    );

    Ok(ProcessingResult {
        frame_count,
        processed_frame_count,
        fps,
        output_width: size.width * 2,
        output_height: size.height,
    })
}

/// Returns (frames written, frames with a pose).
fn stream_frames(
    source: &mut dyn VideoSource,
    sink: &mut dyn VideoSink,
    detector: &mut dyn PoseDetector,
    edges: &[Edge],
    width: i32,
    pb: &ProgressBar,
) -> Result<(usize, usize), PipelineError> {
    let mut frame_count = 0usize;
    let mut processed_frame_count = 0usize;

    loop {
        let frame = source
            .next_frame()
            .with_context(|| format!("Failed to read frame {}", frame_count))
            .map_err(PipelineError::processing)?;
        let Some(frame) = frame else {
            break;
        };

        let (combined, detected) = process_frame(&frame, detector, edges, width)
            .with_context(|| format!("Failed to process frame {}", frame_count))
            .map_err(PipelineError::processing)?;
        if detected {
            processed_frame_count += 1;
        }

        sink.write_frame(&combined)
            .with_context(|| format!("Failed to write frame {}", frame_count))
            .map_err(PipelineError::processing)?;

        frame_count += 1;
        pb.inc(1);
    }

    Ok((frame_count, processed_frame_count))
}

/// Opens `source_path`, writes the side-by-side video to `sink_path` and
/// releases both handles on every exit path.
///
/// The sink is only created after the source opened successfully.
pub fn process_video(
    source_path: &str,
    sink_path: &str,
    codec: FourCc,
    detector: &mut dyn PoseDetector,
) -> Result<ProcessingResult, PipelineError> {
    let mut source = OpencvReader::open(source_path)?;

    let size = source.frame_size();
    let output_size = Size::new(size.width * 2, size.height);
    let mut sink = OpencvWriter::create(sink_path, codec, source.fps(), output_size)
        .map_err(PipelineError::processing)?;

    run_pipeline(&mut source, &mut sink, detector)
}
