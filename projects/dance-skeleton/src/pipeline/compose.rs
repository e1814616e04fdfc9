use anyhow::{ensure, Result};
use opencv::core::{self, Mat, Point, Scalar};
use opencv::imgproc::{put_text, FONT_HERSHEY_SIMPLEX, LINE_8};
use opencv::prelude::*;

pub const ORIGINAL_LABEL: &str = "Original";
pub const SKELETON_LABEL: &str = "Skeleton";

const LABEL_Y: i32 = 30;
const LABEL_X_OFFSET: i32 = 10;
const FONT_SCALE: f64 = 1.0;
const FONT_THICKNESS: i32 = 2;

/// All-black canvas with the same size and type as `frame`.
pub fn blank_like(frame: &Mat) -> Result<Mat> {
    Ok(Mat::new_rows_cols_with_default(
        frame.rows(),
        frame.cols(),
        frame.typ(),
        Scalar::all(0.0),
    )?)
}

/// Places `original` on the left and `skeleton` on the right, then labels both halves.
///
/// `width` is the source width; the right label starts at `width + 10`.
pub fn compose_side_by_side(original: &Mat, skeleton: &Mat, width: i32) -> Result<Mat> {
    ensure!(
        original.rows() == skeleton.rows(),
        "Frame heights differ: {} vs {}",
        original.rows(),
        skeleton.rows()
    );

    let mut combined = Mat::default();
    core::hconcat2(original, skeleton, &mut combined)?;

    let white = Scalar::new(255.0, 255.0, 255.0, 0.0);
    for (label, x) in [
        (ORIGINAL_LABEL, LABEL_X_OFFSET),
        (SKELETON_LABEL, width + LABEL_X_OFFSET),
    ] {
        put_text(
            &mut combined,
            label,
            Point::new(x, LABEL_Y),
            FONT_HERSHEY_SIMPLEX,
            FONT_SCALE,
            white,
            FONT_THICKNESS,
            LINE_8,
            false,
        )?;
    }

    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Rect, Vec3b, CV_8UC3};

    fn solid(rows: i32, cols: i32, value: f64) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(value)).unwrap()
    }

    fn region_sum(mat: &Mat, rect: Rect) -> f64 {
        let roi = Mat::roi(mat, rect).unwrap();
        let mut region = Mat::default();
        roi.copy_to(&mut region).unwrap();
        let s = core::sum_elems(&region).unwrap();
        s[0] + s[1] + s[2]
    }

    #[test]
    fn test_blank_like_matches_frame() {
        let frame = solid(12, 20, 200.0);
        let blank = blank_like(&frame).unwrap();
        assert_eq!(blank.size().unwrap(), frame.size().unwrap());
        assert_eq!(blank.typ(), frame.typ());
        assert_eq!(region_sum(&blank, Rect::new(0, 0, 20, 12)), 0.0);
    }

    #[test]
    fn test_compose_dimensions_and_halves() {
        let original = solid(120, 160, 100.0);
        let skeleton = blank_like(&original).unwrap();
        let combined = compose_side_by_side(&original, &skeleton, 160).unwrap();

        assert_eq!(combined.cols(), 320);
        assert_eq!(combined.rows(), 120);

        // Below the labels the halves are untouched
        let left = combined.at_2d::<Vec3b>(100, 80).unwrap();
        assert_eq!(left[0], 100);
        let right = combined.at_2d::<Vec3b>(100, 240).unwrap();
        assert_eq!(right[0], 0);
    }

    #[test]
    fn test_labels_drawn_in_each_half() {
        let original = solid(80, 200, 0.0);
        let skeleton = solid(80, 200, 0.0);
        let combined = compose_side_by_side(&original, &skeleton, 200).unwrap();

        // Label band around the text baseline
        assert!(region_sum(&combined, Rect::new(0, 0, 200, 40)) > 0.0);
        assert!(region_sum(&combined, Rect::new(200, 0, 200, 40)) > 0.0);
        assert_eq!(region_sum(&combined, Rect::new(0, 50, 400, 30)), 0.0);
    }

    #[test]
    fn test_height_mismatch_is_error() {
        let original = solid(10, 10, 0.0);
        let skeleton = solid(12, 10, 0.0);
        assert!(compose_side_by_side(&original, &skeleton, 10).is_err());
    }
}
