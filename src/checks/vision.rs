use std::collections::HashSet;

use super::{CheckOutput, ColorPair};
use crate::core::{Category, ContextDetail, Finding, FindingContext, Severity};
use crate::vision::{DEFAULT_THRESHOLD, test_all_vision_types};

/// Color-vision pass over the pairs the contrast pass resolved. A pair that is
/// indistinct under any simulated deficiency is reported, including pairs the
/// contrast pass may already flag.
pub fn check(pairs: &[ColorPair]) -> CheckOutput<()> {
    let mut findings = Vec::new();
    let mut seen = HashSet::new();

    for pair in pairs {
        let fg = pair.foreground.to_hex();
        let bg = pair.background.to_hex();
        if !seen.insert((fg.clone(), bg.clone())) {
            continue;
        }
        let report = test_all_vision_types(&pair.foreground, &pair.background, DEFAULT_THRESHOLD);
        if report.is_accessible {
            continue;
        }
        let failing: Vec<String> = report
            .failing_types
            .iter()
            .map(|v| v.as_str().to_string())
            .collect();
        findings.push(
            Finding::new(
                Category::Vision,
                "color_vision_conflict",
                Severity::High,
                format!(
                    "Text color {fg} on {bg} is hard to tell apart with {}",
                    failing.join(", ")
                ),
                "Increase the lightness difference between text and background; do not rely on hue alone.",
                FindingContext::new(pair.selector.clone()).with_detail(ContextDetail::Vision {
                    foreground: fg,
                    background: bg,
                    max_impact: report.max_impact(),
                    failing_types: failing,
                }),
            )
            .with_wcag("1.4.1"),
        );
    }

    CheckOutput::new(findings, ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorSample;

    fn pair(selector: &str, fg: ColorSample, bg: ColorSample) -> ColorPair {
        ColorPair {
            selector: selector.to_string(),
            foreground: fg,
            background: bg,
        }
    }

    #[test]
    fn hue_only_pair_is_reported_once() {
        let red = ColorSample::rgb(255, 0, 0);
        let green = ColorSample::rgb(0, 128, 0);
        let out = check(&[pair("p.a", red, green), pair("p.b", red, green)]);
        assert_eq!(out.findings.len(), 1);
        let f = &out.findings[0];
        assert_eq!(f.finding_type, "color_vision_conflict");
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.selector(), "p.a");
        match &f.context.detail {
            ContextDetail::Vision {
                failing_types,
                max_impact,
                ..
            } => {
                assert_eq!(failing_types, &vec!["achromatopsia".to_string()]);
                assert_eq!(*max_impact, 99);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn black_on_white_is_fine() {
        let out = check(&[pair("p", ColorSample::BLACK, ColorSample::WHITE)]);
        assert!(out.findings.is_empty());
    }

    #[test]
    fn nearly_identical_colors_fail_every_vision_type() {
        let out = check(&[pair(
            "p",
            ColorSample::rgb(200, 200, 200),
            ColorSample::rgb(210, 210, 210),
        )]);
        assert_eq!(out.findings.len(), 1);
        match &out.findings[0].context.detail {
            ContextDetail::Vision { failing_types, .. } => assert_eq!(failing_types.len(), 8),
            other => panic!("unexpected detail {other:?}"),
        }
    }
}
