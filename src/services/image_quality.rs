//! Photo quality gate: sharpness, exposure and contrast on the grayscale image.

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

const BLUR_VARIANCE_SCALE: f64 = 500.0;
const CONTRAST_STD_SCALE: f64 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub blur: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub score: f64,
}

pub fn assess(image: &DynamicImage) -> QualityReport {
    assess_gray(&image.to_luma8())
}

pub fn assess_gray(gray: &GrayImage) -> QualityReport {
    let laplacian = imageproc::filter::laplacian_filter(gray);
    let laplacian_variance = laplacian
        .pixels()
        .map(|p| p[0] as f64)
        .population_variance();
    let blur = finite_or_zero(laplacian_variance / BLUR_VARIANCE_SCALE).min(1.0);

    let intensities: Vec<f64> = gray.pixels().map(|p| p[0] as f64).collect();
    let mean = finite_or_zero(intensities.iter().mean());
    let std_dev = finite_or_zero(intensities.iter().population_std_dev());

    let mut brightness = 1.0 - (mean - 128.0).abs() / 128.0;
    if !(30.0..=220.0).contains(&mean) {
        brightness *= 0.5;
    }
    let contrast = (std_dev / CONTRAST_STD_SCALE).min(1.0);

    let score = (0.4 * blur + 0.3 * brightness + 0.3 * contrast).min(1.0);

    QualityReport {
        blur,
        brightness,
        contrast,
        score,
    }
}

// statrs returns NaN for empty input
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
