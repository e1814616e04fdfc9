use crate::error::PipelineError;
use crate::pipeline::topology::COCO_SKELETON;
use crate::pipeline::types::{Edge, Keypoint};
use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageBuffer, Rgb};
use opencv::core::Mat;
use opencv::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard};
use usls::models::RTMO;
use usls::{Config, Image};

/// A single-person pose estimator.
///
/// `detect` returns the keypoints of one person in the detector's own landmark
/// order, or an empty list when nobody is found. `edges` indexes into that order.
pub trait PoseDetector: Send {
    fn name(&self) -> &str;
    fn edges(&self) -> &[Edge];
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Keypoint>>;
}

/// A wrapper around the USLS RTMO model that handles BGR-to-RGB conversion
/// and maps the strongest person to normalized COCO-17 keypoints.
pub struct PoseEstimator {
    model: RTMO,
}

impl PoseEstimator {
    pub const NAME: &'static str = "rtmo";

    /// Create a new estimator, optionally from a local model file.
    pub fn new(model_path: Option<&str>) -> Result<Self> {
        let mut config = Config::rtmo_s();
        if let Some(path) = model_path {
            config = config.with_model_file(path);
        }

        #[cfg(target_os = "macos")]
        let config = config.with_model_device(usls::Device::CoreMl);

        let config = config.commit()?;
        let model = RTMO::new(config)?;
        Ok(Self { model })
    }
}

impl PoseDetector for PoseEstimator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn edges(&self) -> &[Edge] {
        &COCO_SKELETON
    }

    fn detect(&mut self, frame: &Mat) -> Result<Vec<Keypoint>> {
        let size = frame.size()?;
        let (w, h) = (size.width as f32, size.height as f32);
        if w <= 0.0 || h <= 0.0 {
            return Ok(Vec::new());
        }

        let image = Image::from(mat_to_dynamic_image(frame)?);
        let results = self.model.forward(&[image])?;
        let Some(y) = results.into_iter().next() else {
            return Ok(Vec::new());
        };

        let people: Vec<Vec<Keypoint>> = y
            .keypointss
            .iter()
            .map(|person| {
                person
                    .iter()
                    .map(|kp| Keypoint::new(kp.x() / w, kp.y() / h, kp.confidence().unwrap_or(0.0)))
                    .collect()
            })
            .collect();

        Ok(strongest_person(people))
    }
}

/// Picks the person with the highest mean keypoint visibility.
pub fn strongest_person(people: Vec<Vec<Keypoint>>) -> Vec<Keypoint> {
    let mean = |kps: &[Keypoint]| {
        if kps.is_empty() {
            0.0
        } else {
            kps.iter().map(|k| k.visibility).sum::<f32>() / kps.len() as f32
        }
    };

    people
        .into_iter()
        .filter(|p| !p.is_empty())
        .max_by(|a, b| mean(a).total_cmp(&mean(b)))
        .unwrap_or_default()
}

/// Convert an OpenCV Mat (BGR) to an image::DynamicImage (RGB)
fn mat_to_dynamic_image(mat: &Mat) -> Result<DynamicImage> {
    let mut rgb_mat = Mat::default();
    opencv::imgproc::cvt_color_def(mat, &mut rgb_mat, opencv::imgproc::COLOR_BGR2RGB)?;

    let size = rgb_mat.size()?;
    let width = size.width as u32;
    let height = size.height as u32;

    if !rgb_mat.is_continuous() {
        return Err(anyhow!("Mat is not continuous"));
    }

    let buffer = rgb_mat.data_bytes()?.to_vec();
    let img_buffer = ImageBuffer::<Rgb<u8>, _>::from_vec(width, height, buffer)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from Mat data"))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}

pub type SharedDetector = Arc<Mutex<Box<dyn PoseDetector>>>;

/// The process-wide detector, or the reason it failed to load at startup.
#[derive(Clone)]
pub struct DetectorSlot {
    name: String,
    detector: Result<SharedDetector, String>,
}

impl DetectorSlot {
    pub fn loaded(detector: Box<dyn PoseDetector>) -> Self {
        Self {
            name: detector.name().to_string(),
            detector: Ok(Arc::new(Mutex::new(detector))),
        }
    }

    pub fn unavailable(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            detector: Err(reason.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self) -> bool {
        self.detector.is_ok()
    }

    pub fn shared(&self) -> Result<SharedDetector, PipelineError> {
        self.detector
            .clone()
            .map_err(PipelineError::DependencyUnavailable)
    }
}

/// Locks the shared detector. A poisoned lock only means an earlier job
/// panicked mid-frame; the model holds no cross-call state.
pub fn lock_detector(shared: &SharedDetector) -> MutexGuard<'_, Box<dyn PoseDetector>> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Loads the pose estimator once at startup. Failure is recorded, not fatal.
pub fn load_detector(model_path: Option<&str>) -> DetectorSlot {
    match PoseEstimator::new(model_path) {
        Ok(estimator) => {
            tracing::info!("Pose estimator '{}' loaded", PoseEstimator::NAME);
            DetectorSlot::loaded(Box::new(estimator))
        }
        Err(e) => {
            tracing::warn!(
                "Pose estimator '{}' unavailable, /process will be rejected: {:#}",
                PoseEstimator::NAME,
                e
            );
            DetectorSlot::unavailable(PoseEstimator::NAME, format!("{:#}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDetector;

    impl PoseDetector for NullDetector {
        fn name(&self) -> &str {
            "null"
        }
        fn edges(&self) -> &[Edge] {
            &[]
        }
        fn detect(&mut self, _frame: &Mat) -> Result<Vec<Keypoint>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_strongest_person() {
        let weak = vec![Keypoint::new(0.1, 0.1, 0.2); 3];
        let strong = vec![Keypoint::new(0.9, 0.9, 0.8); 3];
        let chosen = strongest_person(vec![weak, Vec::new(), strong.clone()]);
        assert_eq!(chosen, strong);

        assert!(strongest_person(Vec::new()).is_empty());
        assert!(strongest_person(vec![Vec::new()]).is_empty());
    }

    #[test]
    fn test_slot_states() {
        let slot = DetectorSlot::loaded(Box::new(NullDetector));
        assert!(slot.is_available());
        assert_eq!(slot.name(), "null");
        let shared = slot.shared().unwrap();
        assert_eq!(lock_detector(&shared).name(), "null");

        let missing = DetectorSlot::unavailable("rtmo", "weights not found");
        assert!(!missing.is_available());
        assert_eq!(missing.name(), "rtmo");
        assert!(matches!(
            missing.shared(),
            Err(PipelineError::DependencyUnavailable(reason)) if reason == "weights not found"
        ));
    }

    #[test]
    fn test_mat_to_dynamic_image_swaps_channels() {
        use opencv::core::{Scalar, CV_8UC3};
        let bgr =
            Mat::new_rows_cols_with_default(2, 3, CV_8UC3, Scalar::new(10.0, 20.0, 30.0, 0.0))
                .unwrap();
        let img = mat_to_dynamic_image(&bgr).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(0, 0).0, [30, 20, 10]);
    }
}
