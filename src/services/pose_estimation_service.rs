/// Pose estimation with a YOLOv8-pose model.
///
/// Model contract:
/// - Input `images`: [1, 3, 640, 640] FP32, NCHW, RGB scaled to [0, 1], letterboxed
/// - Output `output0`: [1, 56, N] FP32 where each anchor holds
///   4 box values, 1 person confidence and 17 COCO keypoints as (x, y, conf)
///
/// Decoding, non-maximum suppression and the letterbox transform are plain
/// functions so they work without the ONNX runtime. The runtime itself is only
/// compiled with the `onnx` feature.
use anyhow::Result;
use image::DynamicImage;
use std::sync::Arc;

use crate::config::VisionConfig;

pub const MODEL_INPUT_SIZE: u32 = 640;
pub const NUM_KEYPOINTS: usize = 17;
/// 4 box values + 1 confidence + 17 * 3 keypoint values
pub const ATTRIBUTES_PER_ANCHOR: usize = 5 + NUM_KEYPOINTS * 3;
const LETTERBOX_FILL: u8 = 114;

pub const COCO_KEYPOINT_NAMES: [&str; NUM_KEYPOINTS] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CocoKeypoint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl CocoKeypoint {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        COCO_KEYPOINT_NAMES[self.index()]
    }
}

/// Keypoint in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

/// A detected person. Box is centre/size and, like the keypoints, normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct PersonPose {
    pub bbox_x: f32,
    pub bbox_y: f32,
    pub bbox_width: f32,
    pub bbox_height: f32,
    pub confidence: f32,
    pub keypoints: Vec<Keypoint>,
}

impl PersonPose {
    pub fn keypoint(&self, kp: CocoKeypoint) -> Option<&Keypoint> {
        self.keypoints.get(kp.index())
    }

    pub fn is_visible(&self, kp: CocoKeypoint, min_confidence: f32) -> bool {
        self.keypoint(kp)
            .map(|k| k.confidence >= min_confidence)
            .unwrap_or(false)
    }

    /// Mean keypoint confidence
    pub fn mean_keypoint_confidence(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        self.keypoints.iter().map(|k| k.confidence).sum::<f32>() / self.keypoints.len() as f32
    }

    pub fn to_pixel_coords(&self, img_width: u32, img_height: u32) -> PersonPose {
        let w = img_width as f32;
        let h = img_height as f32;
        PersonPose {
            bbox_x: self.bbox_x * w,
            bbox_y: self.bbox_y * h,
            bbox_width: self.bbox_width * w,
            bbox_height: self.bbox_height * h,
            confidence: self.confidence,
            keypoints: self
                .keypoints
                .iter()
                .map(|kp| Keypoint {
                    x: kp.x * w,
                    y: kp.y * h,
                    confidence: kp.confidence,
                })
                .collect(),
        }
    }

    fn bbox(&self) -> (f32, f32, f32, f32) {
        (self.bbox_x, self.bbox_y, self.bbox_width, self.bbox_height)
    }
}

/// Anything that finds people and their keypoints in an image
#[cfg_attr(test, mockall::automock)]
pub trait PoseDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<PersonPose>>;
}

/// Aspect-preserving resize into a square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub new_width: u32,
    pub new_height: u32,
}

impl Letterbox {
    pub fn compute(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_width = ((width as f32 * scale) as u32).clamp(1, target);
        let new_height = ((height as f32 * scale) as u32).clamp(1, target);

        Self {
            scale,
            pad_x: (target - new_width) / 2,
            pad_y: (target - new_height) / 2,
            new_width,
            new_height,
        }
    }

    /// Letterboxed RGB image of `target` x `target`
    pub fn apply(&self, image: &DynamicImage, target: u32) -> image::RgbImage {
        let resized = image
            .resize_exact(
                self.new_width,
                self.new_height,
                image::imageops::FilterType::Triangle,
            )
            .to_rgb8();

        let mut padded = image::RgbImage::from_pixel(
            target,
            target,
            image::Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
        );
        image::imageops::overlay(&mut padded, &resized, self.pad_x as i64, self.pad_y as i64);
        padded
    }

    /// Map a detection from model-input pixels back to normalized original-image coordinates
    pub fn to_normalized(&self, mut person: PersonPose, img_width: u32, img_height: u32) -> PersonPose {
        let w = img_width as f32;
        let h = img_height as f32;
        let unmap_x = |x: f32| ((x - self.pad_x as f32) / self.scale / w).clamp(0.0, 1.0);
        let unmap_y = |y: f32| ((y - self.pad_y as f32) / self.scale / h).clamp(0.0, 1.0);

        person.bbox_x = unmap_x(person.bbox_x);
        person.bbox_y = unmap_y(person.bbox_y);
        person.bbox_width = person.bbox_width / self.scale / w;
        person.bbox_height = person.bbox_height / self.scale / h;

        for kp in &mut person.keypoints {
            kp.x = unmap_x(kp.x);
            kp.y = unmap_y(kp.y);
        }

        person
    }
}

/// Decode a raw `[56, num_anchors]` row-major output into detections above `conf_threshold`.
pub fn decode_yolo_output(data: &[f32], num_anchors: usize, conf_threshold: f32) -> Vec<PersonPose> {
    if num_anchors == 0 || data.len() < ATTRIBUTES_PER_ANCHOR * num_anchors {
        return Vec::new();
    }

    let value = |attr: usize, anchor: usize| data[attr * num_anchors + anchor];

    (0..num_anchors)
        .filter(|&anchor| value(4, anchor) >= conf_threshold)
        .map(|anchor| {
            let keypoints = (0..NUM_KEYPOINTS)
                .map(|kp| {
                    let base = 5 + kp * 3;
                    Keypoint {
                        x: value(base, anchor),
                        y: value(base + 1, anchor),
                        confidence: value(base + 2, anchor),
                    }
                })
                .collect();

            PersonPose {
                bbox_x: value(0, anchor),
                bbox_y: value(1, anchor),
                bbox_width: value(2, anchor),
                bbox_height: value(3, anchor),
                confidence: value(4, anchor),
                keypoints,
            }
        })
        .collect()
}

/// Greedy non-maximum suppression, highest confidence first
pub fn apply_nms(mut detections: Vec<PersonPose>, iou_threshold: f32) -> Vec<PersonPose> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<PersonPose> = Vec::new();
    for candidate in detections {
        if keep
            .iter()
            .all(|kept| calculate_iou(kept.bbox(), candidate.bbox()) < iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection over union of two centre/size boxes
pub fn calculate_iou(bbox1: (f32, f32, f32, f32), bbox2: (f32, f32, f32, f32)) -> f32 {
    let (x1, y1, w1, h1) = bbox1;
    let (x2, y2, w2, h2) = bbox2;

    let inter_w = ((x1 + w1 / 2.0).min(x2 + w2 / 2.0) - (x1 - w1 / 2.0).max(x2 - w2 / 2.0)).max(0.0);
    let inter_h = ((y1 + h1 / 2.0).min(y2 + h2 / 2.0) - (y1 - h1 / 2.0).max(y2 - h2 / 2.0)).max(0.0);
    let inter_area = inter_w * inter_h;
    let union_area = w1 * h1 + w2 * h2 - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}

#[cfg(feature = "onnx")]
mod onnx {
    use anyhow::{Context, Result};
    use image::{DynamicImage, GenericImageView};
    use ndarray::Array4;
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use ort::value::Tensor;
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;

    pub struct OnnxPoseDetector {
        session: Mutex<Session>,
        confidence_threshold: f32,
        nms_threshold: f32,
    }

    impl OnnxPoseDetector {
        pub fn new(model_path: &Path, confidence_threshold: f32, nms_threshold: f32) -> Result<Self> {
            let session = Session::builder()
                .context("Failed to create session builder")?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(4)?
                .commit_from_file(model_path)
                .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))?;

            tracing::info!(path = %model_path.display(), "Loaded pose estimation model");

            Ok(Self {
                session: Mutex::new(session),
                confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
                nms_threshold: nms_threshold.clamp(0.0, 1.0),
            })
        }

        fn preprocess(&self, image: &DynamicImage, letterbox: &Letterbox) -> Array4<f32> {
            let padded = letterbox.apply(image, MODEL_INPUT_SIZE);
            let size = MODEL_INPUT_SIZE as usize;

            Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
                padded.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
            })
        }
    }

    impl PoseDetector for OnnxPoseDetector {
        fn detect(&self, image: &DynamicImage) -> Result<Vec<PersonPose>> {
            let (width, height) = image.dimensions();
            let letterbox = Letterbox::compute(width, height, MODEL_INPUT_SIZE);
            let input = Tensor::from_array(self.preprocess(image, &letterbox))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow::anyhow!("Pose session lock poisoned"))?;
            let outputs = session
                .run(ort::inputs!["images" => input])
                .context("Failed to run pose inference")?;

            let (shape, data) = outputs["output0"]
                .try_extract_tensor::<f32>()
                .context("Failed to extract pose output tensor")?;
            let num_anchors = shape.get(2).copied().unwrap_or(0).max(0) as usize;

            let detections = decode_yolo_output(data, num_anchors, self.confidence_threshold);
            Ok(apply_nms(detections, self.nms_threshold)
                .into_iter()
                .map(|person| letterbox.to_normalized(person, width, height))
                .collect())
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxPoseDetector;

/// Build the configured detector. Returns `None` when no model is available,
/// in which case photo analysis is reported as unavailable.
pub fn load_detector(config: &VisionConfig) -> Result<Option<Arc<dyn PoseDetector>>> {
    let Some(path) = config.pose_model_path.as_ref() else {
        tracing::warn!("POSE_MODEL_PATH not set, photo analysis disabled");
        return Ok(None);
    };

    #[cfg(feature = "onnx")]
    {
        let detector =
            OnnxPoseDetector::new(path, config.confidence_threshold, config.nms_threshold)?;
        Ok(Some(Arc::new(detector)))
    }

    #[cfg(not(feature = "onnx"))]
    {
        tracing::warn!(
            path = %path.display(),
            "Built without the onnx feature, photo analysis disabled"
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn person(cx: f32, cy: f32, size: f32, confidence: f32) -> PersonPose {
        PersonPose {
            bbox_x: cx,
            bbox_y: cy,
            bbox_width: size,
            bbox_height: size,
            confidence,
            keypoints: vec![
                Keypoint {
                    x: cx,
                    y: cy,
                    confidence: 0.9
                };
                NUM_KEYPOINTS
            ],
        }
    }

    #[test]
    fn test_coco_keypoint_names() {
        assert_eq!(COCO_KEYPOINT_NAMES.len(), 17);
        assert_eq!(CocoKeypoint::Nose.name(), "nose");
        assert_eq!(CocoKeypoint::RightAnkle.name(), "right_ankle");
        assert_eq!(CocoKeypoint::LeftHip.index(), 11);
    }

    #[test]
    fn test_iou_calculation() {
        let iou = calculate_iou((100.0, 100.0, 50.0, 50.0), (100.0, 100.0, 50.0, 50.0));
        assert!((iou - 1.0).abs() < 0.01);

        let iou = calculate_iou((100.0, 100.0, 50.0, 50.0), (200.0, 200.0, 50.0, 50.0));
        assert!(iou < 0.01);

        let iou = calculate_iou((100.0, 100.0, 50.0, 50.0), (120.0, 120.0, 50.0, 50.0));
        assert!(iou > 0.0 && iou < 1.0);
    }

    #[test]
    fn test_nms_keeps_best_of_overlapping() {
        let kept = apply_nms(
            vec![
                person(100.0, 100.0, 50.0, 0.6),
                person(102.0, 101.0, 50.0, 0.9),
                person(400.0, 400.0, 50.0, 0.7),
            ],
            0.45,
        );

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.7);
    }

    #[test]
    fn test_decode_filters_by_confidence() {
        let anchors = 3;
        let mut data = vec![0.0f32; ATTRIBUTES_PER_ANCHOR * anchors];
        // anchor 1 is the only confident one
        data[anchors + 1] = 320.0; // y of anchor 1
        data[4 * anchors] = 0.2;
        data[4 * anchors + 1] = 0.8;
        data[4 * anchors + 2] = 0.1;
        // nose confidence of anchor 1
        data[7 * anchors + 1] = 0.95;

        let decoded = decode_yolo_output(&data, anchors, 0.5);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].bbox_y, 320.0);
        assert_eq!(decoded[0].keypoints.len(), NUM_KEYPOINTS);
        assert_eq!(decoded[0].keypoints[0].confidence, 0.95);
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        assert!(decode_yolo_output(&[0.0; 10], 5, 0.5).is_empty());
    }

    #[test]
    fn test_letterbox_round_trip() {
        // 1280x640 image: scale 0.5, vertical padding of 160
        let letterbox = Letterbox::compute(1280, 640, MODEL_INPUT_SIZE);
        assert_eq!(letterbox.scale, 0.5);
        assert_eq!((letterbox.pad_x, letterbox.pad_y), (0, 160));

        let normalized = letterbox.to_normalized(person(320.0, 320.0, 64.0, 0.9), 1280, 640);
        assert!((normalized.bbox_x - 0.5).abs() < 1e-6);
        assert!((normalized.bbox_y - 0.5).abs() < 1e-6);
        assert!((normalized.bbox_width - 0.1).abs() < 1e-6);
        assert!((normalized.keypoints[0].y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_apply_size() {
        let image = DynamicImage::new_rgb8(200, 100);
        let letterbox = Letterbox::compute(200, 100, MODEL_INPUT_SIZE);
        let padded = letterbox.apply(&image, MODEL_INPUT_SIZE);
        assert_eq!(padded.dimensions(), (MODEL_INPUT_SIZE, MODEL_INPUT_SIZE));
        assert_eq!(padded.get_pixel(0, 0)[0], LETTERBOX_FILL);
    }

    #[test]
    fn test_load_detector_without_model_path() {
        let config = VisionConfig::default();
        assert!(load_detector(&config).unwrap().is_none());
    }
}
