//! Body measurements, body-fat estimation and posture rules from a detected pose.

use image::GrayImage;

use crate::config::PostureThresholds;
use crate::models::{Anthropometrics, BodyFatBreakdown, ConfidenceLevel, PostureFlag, Sex};
use crate::services::nutrition_service::round_to;
use crate::services::pose_estimation_service::{CocoKeypoint, Keypoint, PersonPose};

const FALLBACK_CM_PER_PIXEL: f64 = 0.3;

const WAIST_TO_SHOULDER: f64 = 0.75;
const NECK_TO_SHOULDER: f64 = 0.35;
const CHEST_TO_SHOULDER: f64 = 0.85;
const THIGH_TO_HIP: f64 = 0.4;
const ARM_TO_SHOULDER: f64 = 0.3;

// depth of each cross-section as a fraction of its frontal width
const WAIST_DEPTH: f64 = 0.75;
const NECK_DEPTH: f64 = 0.8;
const HIP_DEPTH: f64 = 0.8;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

const BLEND_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];

/// Who is in the photo. Height sets the pixel scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subject {
    pub height_cm: f64,
    pub weight_kg: f64,
    pub sex: Sex,
}

impl Default for Subject {
    fn default() -> Self {
        Self {
            height_cm: 175.0,
            weight_kg: 70.0,
            sex: Sex::Male,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFatEstimate {
    pub percentage: f64,
    pub breakdown: BodyFatBreakdown,
    pub confidence: ConfidenceLevel,
}

fn distance(a: &Keypoint, b: &Keypoint) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

fn point(pose: &PersonPose, kp: CocoKeypoint) -> Keypoint {
    pose.keypoint(kp).copied().unwrap_or(Keypoint {
        x: 0.0,
        y: 0.0,
        confidence: 0.0,
    })
}

/// Measurements from a pose in pixel coordinates
pub fn measure_anthropometrics(pose_px: &PersonPose, height_cm: f64) -> Anthropometrics {
    let p = |kp| point(pose_px, kp);

    let body_height_px = (distance(&p(CocoKeypoint::Nose), &p(CocoKeypoint::LeftAnkle))
        + distance(&p(CocoKeypoint::Nose), &p(CocoKeypoint::RightAnkle)))
        / 2.0;
    let cm_per_px = if body_height_px > 0.0 {
        height_cm / body_height_px
    } else {
        FALLBACK_CM_PER_PIXEL
    };

    let shoulder_cm = distance(&p(CocoKeypoint::LeftShoulder), &p(CocoKeypoint::RightShoulder)) * cm_per_px;
    let hip_cm = distance(&p(CocoKeypoint::LeftHip), &p(CocoKeypoint::RightHip)) * cm_per_px;

    let femur_px = (distance(&p(CocoKeypoint::LeftHip), &p(CocoKeypoint::LeftKnee))
        + distance(&p(CocoKeypoint::RightHip), &p(CocoKeypoint::RightKnee)))
        / 2.0;
    let femur_to_height_ratio = if height_cm > 0.0 {
        femur_px * cm_per_px / height_cm
    } else {
        0.0
    };

    Anthropometrics {
        shoulder_cm: round_to(shoulder_cm, 1),
        chest_cm: round_to(shoulder_cm * CHEST_TO_SHOULDER, 1),
        waist_cm: round_to(shoulder_cm * WAIST_TO_SHOULDER, 1),
        hip_cm: round_to(hip_cm, 1),
        neck_cm: round_to(shoulder_cm * NECK_TO_SHOULDER, 1),
        thigh_cm: round_to(hip_cm * THIGH_TO_HIP, 1),
        arm_cm: round_to(shoulder_cm * ARM_TO_SHOULDER, 1),
        femur_to_height_ratio: round_to(femur_to_height_ratio, 3),
    }
}

pub fn waist_to_hip_ratio(anthro: &Anthropometrics) -> f64 {
    if anthro.hip_cm > 0.0 {
        round_to(anthro.waist_cm / anthro.hip_cm, 3)
    } else {
        0.0
    }
}

/// Ramanujan's approximation for the perimeter of an ellipse with the given
/// frontal width and depth ratio
pub fn ellipse_circumference(width: f64, depth_ratio: f64) -> f64 {
    let a = width / 2.0;
    let b = a * depth_ratio;
    std::f64::consts::PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt())
}

pub fn navy_body_fat(sex: Sex, anthro: &Anthropometrics, height_cm: f64) -> f64 {
    let waist = ellipse_circumference(anthro.waist_cm, WAIST_DEPTH);
    let neck = ellipse_circumference(anthro.neck_cm, NECK_DEPTH);
    let hip = ellipse_circumference(anthro.hip_cm, HIP_DEPTH);

    let (estimate, fallback) = match sex {
        Sex::Male => (
            86.010 * (waist - neck).log10() - 70.041 * height_cm.log10() + 36.76,
            15.0,
        ),
        Sex::Female => (
            163.205 * (waist + hip - neck).log10() - 97.684 * height_cm.log10() - 78.387,
            23.0,
        ),
    };

    if estimate.is_finite() {
        estimate.clamp(3.0, 50.0)
    } else {
        fallback
    }
}

/// Fraction of edge pixels inside the person box
pub fn edge_density(gray: &GrayImage, pose_px: &PersonPose) -> Option<f64> {
    let (img_w, img_h) = gray.dimensions();
    let x0 = (pose_px.bbox_x - pose_px.bbox_width / 2.0).max(0.0) as u32;
    let y0 = (pose_px.bbox_y - pose_px.bbox_height / 2.0).max(0.0) as u32;
    let x1 = ((pose_px.bbox_x + pose_px.bbox_width / 2.0).max(0.0) as u32).min(img_w);
    let y1 = ((pose_px.bbox_y + pose_px.bbox_height / 2.0).max(0.0) as u32).min(img_h);

    if x1 <= x0 + 2 || y1 <= y0 + 2 {
        return None;
    }

    let crop = image::imageops::crop_imm(gray, x0, y0, x1 - x0, y1 - y0).to_image();
    let edges = imageproc::edges::canny(&crop, CANNY_LOW, CANNY_HIGH);
    let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count();

    Some(edge_pixels as f64 / (crop.width() * crop.height()) as f64)
}

pub fn visual_body_fat(sex: Sex, density: Option<f64>) -> f64 {
    let base = match sex {
        Sex::Male => 18.0,
        Sex::Female => 25.0,
    };
    let density = density.unwrap_or(0.5);
    (base + (0.5 - density) * 20.0).clamp(8.0, 45.0)
}

pub fn ratio_body_fat(sex: Sex, whr: f64) -> f64 {
    match sex {
        Sex::Male if whr < 0.85 => 12.0,
        Sex::Male if whr < 0.95 => 18.0,
        Sex::Male => 25.0,
        Sex::Female if whr < 0.75 => 16.0,
        Sex::Female if whr < 0.85 => 23.0,
        Sex::Female => 32.0,
    }
}

/// Blend the three estimates; agreement between them sets the confidence
pub fn blend_body_fat(breakdown: BodyFatBreakdown) -> BodyFatEstimate {
    let estimates = [breakdown.navy, breakdown.visual, breakdown.ratio];
    let blended: f64 = estimates
        .iter()
        .zip(BLEND_WEIGHTS)
        .map(|(estimate, weight)| estimate * weight)
        .sum();

    let max_deviation = estimates
        .iter()
        .map(|estimate| (estimate - blended).abs())
        .fold(0.0, f64::max);

    let confidence = if max_deviation < 3.0 {
        ConfidenceLevel::High
    } else if max_deviation < 6.0 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    };

    BodyFatEstimate {
        percentage: round_to(blended, 1),
        breakdown: BodyFatBreakdown {
            navy: round_to(breakdown.navy, 1),
            visual: round_to(breakdown.visual, 1),
            ratio: round_to(breakdown.ratio, 1),
        },
        confidence,
    }
}

/// Posture rules on a pose in normalized coordinates. A rule only fires when
/// all the keypoints it reads are visible.
pub fn detect_posture_flags(
    pose: &PersonPose,
    thresholds: &PostureThresholds,
    min_confidence: f32,
) -> Vec<PostureFlag> {
    let visible = |kps: &[CocoKeypoint]| kps.iter().all(|kp| pose.is_visible(*kp, min_confidence));
    let p = |kp| point(pose, kp);
    let mean_y = |a: CocoKeypoint, b: CocoKeypoint| (p(a).y + p(b).y) / 2.0;
    let mean_x = |a: CocoKeypoint, b: CocoKeypoint| (p(a).x + p(b).x) / 2.0;

    use CocoKeypoint::*;
    let mut flags = Vec::new();

    if visible(&[LeftShoulder, RightShoulder, LeftEar, RightEar])
        && mean_y(LeftShoulder, RightShoulder)
            < mean_y(LeftEar, RightEar) - thresholds.rounded_shoulders
    {
        flags.push(PostureFlag::RoundedShoulders);
    }

    if visible(&[LeftShoulder, RightShoulder])
        && (p(LeftShoulder).y - p(RightShoulder).y).abs() > thresholds.asymmetric_shoulders
    {
        flags.push(PostureFlag::AsymmetricShoulders);
    }

    if visible(&[Nose, LeftShoulder, RightShoulder])
        && (p(Nose).x - mean_x(LeftShoulder, RightShoulder)).abs() > thresholds.forward_head
    {
        flags.push(PostureFlag::ForwardHead);
    }

    if visible(&[LeftShoulder, RightShoulder, LeftHip, RightHip])
        && mean_y(LeftHip, RightHip)
            < mean_y(LeftShoulder, RightShoulder) - thresholds.anterior_pelvic_tilt
    {
        flags.push(PostureFlag::AnteriorPelvicTilt);
    }

    if visible(&[LeftKnee, RightKnee, LeftAnkle, RightAnkle]) {
        let knee_spread = (p(LeftKnee).x - p(RightKnee).x).abs();
        let ankle_spread = (p(LeftAnkle).x - p(RightAnkle).x).abs();
        if ankle_spread > 0.0 && knee_spread < thresholds.knee_valgus_ratio * ankle_spread {
            flags.push(PostureFlag::KneeValgus);
        }
    }

    flags
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::services::pose_estimation_service::NUM_KEYPOINTS;

    /// Upright frontal pose in normalized coordinates, centred in the frame
    pub fn standing_pose() -> PersonPose {
        let mut keypoints = vec![
            Keypoint {
                x: 0.5,
                y: 0.5,
                confidence: 0.9
            };
            NUM_KEYPOINTS
        ];
        let mut set = |kp: CocoKeypoint, x: f32, y: f32| {
            keypoints[kp.index()] = Keypoint { x, y, confidence: 0.9 };
        };

        set(CocoKeypoint::Nose, 0.5, 0.1);
        set(CocoKeypoint::LeftEye, 0.51, 0.09);
        set(CocoKeypoint::RightEye, 0.49, 0.09);
        set(CocoKeypoint::LeftEar, 0.52, 0.1);
        set(CocoKeypoint::RightEar, 0.48, 0.1);
        set(CocoKeypoint::LeftShoulder, 0.6, 0.2);
        set(CocoKeypoint::RightShoulder, 0.4, 0.2);
        set(CocoKeypoint::LeftElbow, 0.63, 0.35);
        set(CocoKeypoint::RightElbow, 0.37, 0.35);
        set(CocoKeypoint::LeftWrist, 0.64, 0.48);
        set(CocoKeypoint::RightWrist, 0.36, 0.48);
        set(CocoKeypoint::LeftHip, 0.56, 0.5);
        set(CocoKeypoint::RightHip, 0.44, 0.5);
        set(CocoKeypoint::LeftKnee, 0.56, 0.7);
        set(CocoKeypoint::RightKnee, 0.44, 0.7);
        set(CocoKeypoint::LeftAnkle, 0.56, 0.9);
        set(CocoKeypoint::RightAnkle, 0.44, 0.9);

        PersonPose {
            bbox_x: 0.5,
            bbox_y: 0.5,
            bbox_width: 0.4,
            bbox_height: 0.9,
            confidence: 0.92,
            keypoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::standing_pose;
    use super::*;

    #[test]
    fn test_anthropometrics_scale_from_height() {
        // nose (500, 100) to ankles (440|560, 900)
        let pose_px = standing_pose().to_pixel_coords(1000, 1000);
        let anthro = measure_anthropometrics(&pose_px, 180.0);

        let cm_per_px = 180.0 / (60.0f64.powi(2) + 800.0f64.powi(2)).sqrt();
        assert!((anthro.shoulder_cm - 200.0 * cm_per_px).abs() < 0.06);
        assert!((anthro.hip_cm - 120.0 * cm_per_px).abs() < 0.06);
        assert!((anthro.waist_cm - anthro.shoulder_cm * 0.75).abs() < 0.1);
        assert!((anthro.femur_to_height_ratio - 200.0 * cm_per_px / 180.0).abs() < 0.001);
    }

    #[test]
    fn test_degenerate_pose_uses_fallback_scale() {
        let mut pose = standing_pose();
        for kp in &mut pose.keypoints {
            kp.x = 0.0;
            kp.y = 0.0;
        }
        let anthro = measure_anthropometrics(&pose, 180.0);
        assert_eq!(anthro.shoulder_cm, 0.0);
        assert_eq!(waist_to_hip_ratio(&anthro), 0.0);
    }

    #[test]
    fn test_ellipse_circumference_of_circle() {
        let c = ellipse_circumference(10.0, 1.0);
        assert!((c - std::f64::consts::PI * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_navy_formula_in_plausible_range() {
        let anthro = Anthropometrics {
            shoulder_cm: 40.0,
            chest_cm: 34.0,
            waist_cm: 30.0,
            hip_cm: 30.0,
            neck_cm: 14.0,
            thigh_cm: 12.0,
            arm_cm: 12.0,
            femur_to_height_ratio: 0.25,
        };
        let bf = navy_body_fat(Sex::Male, &anthro, 175.0);
        assert!(bf > 15.0 && bf < 25.0, "got {bf}");
    }

    #[test]
    fn test_navy_falls_back_on_invalid_log() {
        let anthro = Anthropometrics {
            shoulder_cm: 0.0,
            chest_cm: 0.0,
            waist_cm: 0.0,
            hip_cm: 0.0,
            neck_cm: 0.0,
            thigh_cm: 0.0,
            arm_cm: 0.0,
            femur_to_height_ratio: 0.0,
        };
        assert_eq!(navy_body_fat(Sex::Male, &anthro, 175.0), 15.0);
        assert_eq!(navy_body_fat(Sex::Female, &anthro, 165.0), 23.0);
    }

    #[test]
    fn test_visual_and_ratio_estimates() {
        assert_eq!(visual_body_fat(Sex::Male, Some(0.5)), 18.0);
        assert_eq!(visual_body_fat(Sex::Female, Some(0.0)), 35.0);
        assert_eq!(visual_body_fat(Sex::Male, Some(2.0)), 8.0);

        assert_eq!(ratio_body_fat(Sex::Male, 0.80), 12.0);
        assert_eq!(ratio_body_fat(Sex::Male, 0.90), 18.0);
        assert_eq!(ratio_body_fat(Sex::Female, 0.90), 32.0);
    }

    #[test]
    fn test_blend_confidence() {
        let agree = blend_body_fat(BodyFatBreakdown {
            navy: 18.0,
            visual: 19.0,
            ratio: 18.0,
        });
        assert_eq!(agree.percentage, 18.3);
        assert_eq!(agree.confidence, ConfidenceLevel::High);

        let disagree = blend_body_fat(BodyFatBreakdown {
            navy: 10.0,
            visual: 30.0,
            ratio: 25.0,
        });
        assert_eq!(disagree.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_edge_density_on_blank_crop() {
        let gray = GrayImage::from_pixel(200, 200, image::Luma([120]));
        let pose_px = standing_pose().to_pixel_coords(200, 200);
        assert_eq!(edge_density(&gray, &pose_px), Some(0.0));
    }

    #[test]
    fn test_upright_pose_has_no_flags() {
        let flags = detect_posture_flags(&standing_pose(), &PostureThresholds::default(), 0.3);
        assert!(flags.is_empty(), "unexpected flags {flags:?}");
    }

    #[test]
    fn test_posture_flags_fire() {
        let mut pose = standing_pose();
        pose.keypoints[CocoKeypoint::LeftShoulder.index()].y = 0.25;
        pose.keypoints[CocoKeypoint::Nose.index()].x = 0.58;
        pose.keypoints[CocoKeypoint::LeftKnee.index()].x = 0.52;
        pose.keypoints[CocoKeypoint::RightKnee.index()].x = 0.48;

        let flags = detect_posture_flags(&pose, &PostureThresholds::default(), 0.3);
        assert!(flags.contains(&PostureFlag::AsymmetricShoulders));
        assert!(flags.contains(&PostureFlag::ForwardHead));
        assert!(flags.contains(&PostureFlag::KneeValgus));
        assert!(!flags.contains(&PostureFlag::RoundedShoulders));
    }

    #[test]
    fn test_hidden_keypoints_skip_rules() {
        let mut pose = standing_pose();
        pose.keypoints[CocoKeypoint::LeftShoulder.index()].y = 0.3;
        pose.keypoints[CocoKeypoint::LeftShoulder.index()].confidence = 0.1;

        let flags = detect_posture_flags(&pose, &PostureThresholds::default(), 0.3);
        assert!(!flags.contains(&PostureFlag::AsymmetricShoulders));
    }
}
