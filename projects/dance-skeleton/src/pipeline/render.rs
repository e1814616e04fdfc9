use crate::pipeline::types::{Edge, FrameDims, Keypoint};
use anyhow::Result;
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc::{circle, line, FILLED, LINE_8};

/// Bone color (BGR green)
pub const EDGE_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
/// Joint color (BGR red)
pub const JOINT_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);

const EDGE_THICKNESS: i32 = 2;
const JOINT_RADIUS: i32 = 4;

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// Draws the skeleton for one frame on a black canvas of `dims`.
///
/// Bones are drawn first and joints second, so joint markers sit on top of the
/// lines. A bone is drawn only when both of its ends are visible. Edges that
/// reference a missing keypoint are skipped.
pub fn render_skeleton(dims: FrameDims, keypoints: &[Keypoint], edges: &[Edge]) -> Result<Mat> {
    let mut canvas =
        Mat::new_rows_cols_with_default(dims.height, dims.width, dims.typ, Scalar::all(0.0))?;

    for &(start, end) in edges {
        let (Some(a), Some(b)) = (keypoints.get(start), keypoints.get(end)) else {
            tracing::debug!("Skipping edge ({}, {}): keypoint missing", start, end);
            continue;
        };
        if !(a.is_visible() && b.is_visible()) {
            continue;
        }

        let (ax, ay) = a.to_pixel(dims.width, dims.height);
        let (bx, by) = b.to_pixel(dims.width, dims.height);
        line(
            &mut canvas,
            Point::new(ax, ay),
            Point::new(bx, by),
            scalar(EDGE_COLOR),
            EDGE_THICKNESS,
            LINE_8,
            0,
        )?;
    }

    for kp in keypoints.iter().filter(|kp| kp.is_visible()) {
        let (x, y) = kp.to_pixel(dims.width, dims.height);
        circle(
            &mut canvas,
            Point::new(x, y),
            JOINT_RADIUS,
            scalar(JOINT_COLOR),
            FILLED,
            LINE_8,
            0,
        )?;
    }

    Ok(canvas)
}
