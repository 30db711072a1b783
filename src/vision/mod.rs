//! Color-vision-deficiency simulation.
//!
//! Each deficiency is a fixed linear transform over normalized RGB. Color
//! difference is plain Euclidean distance in RGB space, a cheap proxy for
//! perceptual difference.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color::ColorSample;

/// Simulated colors closer than this are treated as indistinguishable.
pub const DEFAULT_THRESHOLD: f64 = 30.0;

type Matrix = [[f64; 3]; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionType {
    Normal,
    Protanopia,
    Protanomaly,
    Deuteranopia,
    Deuteranomaly,
    Tritanopia,
    Tritanomaly,
    Achromatopsia,
    Achromatomaly,
}

impl VisionType {
    pub const DEFICIENCIES: [VisionType; 8] = [
        VisionType::Protanopia,
        VisionType::Protanomaly,
        VisionType::Deuteranopia,
        VisionType::Deuteranomaly,
        VisionType::Tritanopia,
        VisionType::Tritanomaly,
        VisionType::Achromatopsia,
        VisionType::Achromatomaly,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            VisionType::Normal => "normal",
            VisionType::Protanopia => "protanopia",
            VisionType::Protanomaly => "protanomaly",
            VisionType::Deuteranopia => "deuteranopia",
            VisionType::Deuteranomaly => "deuteranomaly",
            VisionType::Tritanopia => "tritanopia",
            VisionType::Tritanomaly => "tritanomaly",
            VisionType::Achromatopsia => "achromatopsia",
            VisionType::Achromatomaly => "achromatomaly",
        }
    }

    const fn matrix(self) -> Option<Matrix> {
        let m = match self {
            VisionType::Normal => return None,
            VisionType::Protanopia => [
                [0.567, 0.433, 0.0],
                [0.558, 0.442, 0.0],
                [0.0, 0.242, 0.758],
            ],
            VisionType::Protanomaly => [
                [0.817, 0.183, 0.0],
                [0.333, 0.667, 0.0],
                [0.0, 0.125, 0.875],
            ],
            VisionType::Deuteranopia => [
                [0.625, 0.375, 0.0],
                [0.7, 0.3, 0.0],
                [0.0, 0.3, 0.7],
            ],
            VisionType::Deuteranomaly => [
                [0.8, 0.2, 0.0],
                [0.258, 0.742, 0.0],
                [0.0, 0.142, 0.858],
            ],
            VisionType::Tritanopia => [
                [0.95, 0.05, 0.0],
                [0.0, 0.433, 0.567],
                [0.0, 0.475, 0.525],
            ],
            VisionType::Tritanomaly => [
                [0.967, 0.033, 0.0],
                [0.0, 0.733, 0.267],
                [0.0, 0.183, 0.817],
            ],
            VisionType::Achromatopsia => [
                [0.299, 0.587, 0.114],
                [0.299, 0.587, 0.114],
                [0.299, 0.587, 0.114],
            ],
            VisionType::Achromatomaly => [
                [0.618, 0.320, 0.062],
                [0.163, 0.775, 0.062],
                [0.163, 0.320, 0.516],
            ],
        };
        Some(m)
    }
}

impl fmt::Display for VisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns how `color` appears under `vision`. Alpha is carried through.
pub fn simulate(color: ColorSample, vision: VisionType) -> ColorSample {
    let Some(m) = vision.matrix() else {
        return color;
    };
    let input = [
        f64::from(color.r) / 255.0,
        f64::from(color.g) / 255.0,
        f64::from(color.b) / 255.0,
    ];
    let row = |i: usize| (m[i][0] * input[0] + m[i][1] * input[1] + m[i][2] * input[2]) * 255.0;
    ColorSample::from_channels(row(0), row(1), row(2), color.a)
}

pub fn color_difference(a: &ColorSample, b: &ColorSample) -> f64 {
    let dr = f64::from(a.r) - f64::from(b.r);
    let dg = f64::from(a.g) - f64::from(b.g);
    let db = f64::from(a.b) - f64::from(b.b);
    (dr * dr + dg * dg + db * db).sqrt()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distinguishability {
    pub vision_type: VisionType,
    pub original_difference: f64,
    pub simulated_difference: f64,
    pub distinguishable: bool,
    /// How much of the original difference is lost, in percent.
    pub impact_percentage: i64,
}

pub fn test_distinguishability(
    c1: &ColorSample,
    c2: &ColorSample,
    vision: VisionType,
    threshold: f64,
) -> Distinguishability {
    let original = color_difference(c1, c2);
    let simulated = color_difference(&simulate(*c1, vision), &simulate(*c2, vision));
    let impact_percentage = if original > 0.0 {
        ((1.0 - simulated / original) * 100.0).round() as i64
    } else {
        0
    };
    Distinguishability {
        vision_type: vision,
        original_difference: original,
        simulated_difference: simulated,
        distinguishable: simulated >= threshold,
        impact_percentage,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionReport {
    pub is_accessible: bool,
    pub failing_types: Vec<VisionType>,
    pub results: Vec<Distinguishability>,
}

impl VisionReport {
    pub fn max_impact(&self) -> i64 {
        self.results
            .iter()
            .filter(|r| !r.distinguishable)
            .map(|r| r.impact_percentage)
            .max()
            .unwrap_or(0)
    }
}

/// Runs every deficiency type; accessible only if none of them fails.
pub fn test_all_vision_types(c1: &ColorSample, c2: &ColorSample, threshold: f64) -> VisionReport {
    let results: Vec<Distinguishability> = VisionType::DEFICIENCIES
        .iter()
        .map(|&vision| test_distinguishability(c1, c2, vision, threshold))
        .collect();
    let failing_types: Vec<VisionType> = results
        .iter()
        .filter(|r| !r.distinguishable)
        .map(|r| r.vision_type)
        .collect();
    VisionReport {
        is_accessible: failing_types.is_empty(),
        failing_types,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_vision_is_identity() {
        for (r, g, b) in [(0, 0, 0), (255, 255, 255), (12, 200, 77), (255, 0, 128)] {
            let c = ColorSample::rgb(r, g, b);
            assert_eq!(simulate(c, VisionType::Normal), c);
        }
    }

    #[test]
    fn achromatopsia_collapses_to_gray() {
        let out = simulate(ColorSample::rgb(255, 0, 0), VisionType::Achromatopsia);
        assert_eq!(out.r, out.g);
        assert_eq!(out.g, out.b);
        assert_eq!(out.r, 76);
    }

    #[test]
    fn simulated_channels_stay_in_range() {
        for vision in VisionType::DEFICIENCIES {
            let out = simulate(ColorSample::WHITE, vision);
            assert!(out.r >= 250 && out.g >= 250 && out.b >= 250, "{vision}: {out:?}");
        }
    }

    #[test]
    fn equal_luminance_red_green_pair_fails_without_color_perception() {
        let red = ColorSample::rgb(255, 0, 0);
        let green = ColorSample::rgb(0, 128, 0);
        let report = test_all_vision_types(&red, &green, DEFAULT_THRESHOLD);
        assert!(!report.is_accessible);
        assert_eq!(report.failing_types, vec![VisionType::Achromatopsia]);
        assert_eq!(report.max_impact(), 99);
    }

    #[test]
    fn black_on_white_is_accessible_for_all_types() {
        let report = test_all_vision_types(&ColorSample::BLACK, &ColorSample::WHITE, DEFAULT_THRESHOLD);
        assert!(report.is_accessible);
        assert_eq!(report.results.len(), 8);
    }

    #[test]
    fn identical_colors_have_zero_impact() {
        let c = ColorSample::rgb(10, 10, 10);
        let result = test_distinguishability(&c, &c, VisionType::Protanopia, DEFAULT_THRESHOLD);
        assert_eq!(result.impact_percentage, 0);
        assert!(!result.distinguishable);
    }
}
