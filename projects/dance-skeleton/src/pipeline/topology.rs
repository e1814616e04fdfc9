// COCO-17 landmark scheme used by the RTMO pose model.

use crate::pipeline::types::Edge;

/// Bones of the COCO pose skeleton as (start, end) keypoint indices.
pub const COCO_SKELETON: [Edge; 19] = [
    (15, 13), // left ankle - left knee
    (13, 11), // left knee - left hip
    (16, 14), // right ankle - right knee
    (14, 12), // right knee - right hip
    (11, 12), // hips
    (5, 11),  // left shoulder - left hip
    (6, 12),  // right shoulder - right hip
    (5, 6),   // shoulders
    (5, 7),   // left shoulder - left elbow
    (6, 8),   // right shoulder - right elbow
    (7, 9),   // left elbow - left wrist
    (8, 10),  // right elbow - right wrist
    (1, 2),   // eyes
    (0, 1),   // nose - left eye
    (0, 2),   // nose - right eye
    (1, 3),   // left eye - left ear
    (2, 4),   // right eye - right ear
    (3, 5),   // left ear - left shoulder
    (4, 6),   // right ear - right shoulder
];
