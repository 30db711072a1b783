use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{CheckOutput, MAX_ELEMENTS};
use crate::background::{self, Resolution};
use crate::color::{
    ColorSample, WcagLevel, check_compliance, contrast_ratio, is_large_text, parse_color_alpha,
    round_to,
};
use crate::core::{AuditOptions, Category, ContextDetail, Finding, FindingContext, Severity};
use crate::page::{NodeId, PageSnapshot, Pseudo, selector_for};

const SKIPPED_TAGS: [&str; 8] = [
    "script", "style", "noscript", "template", "head", "title", "meta", "svg",
];

/// One evaluated (text color, background, size, weight) combination.
///
/// A combination whose colors could not be parsed carries `error` and no
/// ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContrastCheck {
    pub selector: String,
    pub foreground: String,
    pub background: String,
    pub font_size: f64,
    pub font_weight: u16,
    pub large_text: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A resolved text/background pair, handed to the vision pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPair {
    pub selector: String,
    pub foreground: ColorSample,
    pub background: ColorSample,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContrastData {
    pub checks: Vec<ContrastCheck>,
    pub pairs: Vec<ColorPair>,
}

impl ContrastData {
    pub fn passes(&self) -> usize {
        self.checks.iter().filter(|c| c.passes == Some(true)).count()
    }
}

pub fn check(page: &dyn PageSnapshot, opts: &AuditOptions) -> Result<CheckOutput<ContrastData>> {
    let mut data = ContrastData::default();
    let mut findings = Vec::new();
    let mut seen: HashSet<(String, String, i64, u16)> = HashSet::new();
    let mut reviewed: HashSet<(String, String)> = HashSet::new();

    for node in page.elements().into_iter().take(MAX_ELEMENTS) {
        let tag = page.tag_name(node)?;
        if SKIPPED_TAGS.contains(&tag.as_str()) {
            continue;
        }
        let text = page.direct_text(node)?;
        if text.trim().is_empty() || !page.is_visible(node)? {
            continue;
        }

        let style = page.computed_style(node, Pseudo::None)?;
        let fg_value = style.get_or("color", "rgb(0, 0, 0)").to_string();
        let font_size = style.font_size_px();
        let font_weight = style.font_weight();
        let large_text = is_large_text(font_size, font_weight);

        let background = match background::resolve(page, node)? {
            Resolution::Opaque(bg) => bg,
            Resolution::OverImage { ancestor, image } => {
                match background::find_dark_overlay(page, node, ancestor, &image)? {
                    Some(overlay) => overlay,
                    None => {
                        if reviewed.insert((fg_value.clone(), image.clone())) {
                            findings.push(manual_review(page, node, &text, &fg_value, &image)?);
                        }
                        continue;
                    }
                }
            }
            Resolution::Unparsed { value, error } => {
                if seen.insert(dedupe_key(&fg_value, &value, font_size, font_weight)) {
                    data.checks.push(ContrastCheck {
                        selector: selector_for(page, node)?,
                        foreground: fg_value,
                        background: value,
                        font_size,
                        font_weight,
                        large_text,
                        ratio: None,
                        required_ratio: None,
                        passes: None,
                        error: Some(error.to_string()),
                    });
                }
                continue;
            }
        };

        let bg_hex = background.to_hex();
        if !seen.insert(dedupe_key(&fg_value, &bg_hex, font_size, font_weight)) {
            continue;
        }
        let selector = selector_for(page, node)?;

        let foreground = match parse_color_alpha(&fg_value) {
            Ok(fg) if fg.is_opaque() => fg,
            Ok(fg) => fg.over(background).opaque(),
            Err(err) => {
                data.checks.push(ContrastCheck {
                    selector,
                    foreground: fg_value,
                    background: bg_hex,
                    font_size,
                    font_weight,
                    large_text,
                    ratio: None,
                    required_ratio: None,
                    passes: None,
                    error: Some(err.to_string()),
                });
                continue;
            }
        };

        let ratio = contrast_ratio(&foreground, &background);
        let result = check_compliance(ratio, large_text, opts.wcag_level);
        let shown_ratio = round_to(ratio, 2);
        data.checks.push(ContrastCheck {
            selector: selector.clone(),
            foreground: foreground.to_hex(),
            background: bg_hex.clone(),
            font_size,
            font_weight,
            large_text,
            ratio: Some(shown_ratio),
            required_ratio: Some(result.required_ratio),
            passes: Some(result.passes),
            error: None,
        });
        data.pairs.push(ColorPair {
            selector: selector.clone(),
            foreground,
            background,
        });

        if !result.passes {
            findings.push(
                Finding::new(
                    Category::Contrast,
                    "insufficient_contrast",
                    Severity::Critical,
                    format!(
                        "Text contrast {shown_ratio}:1 is below the {} requirement of {}:1",
                        result.level, result.required_ratio
                    ),
                    format!(
                        "Darken the text or lighten the background to reach at least {}:1.",
                        result.required_ratio
                    ),
                    FindingContext::new(selector)
                        .with_text(&text)
                        .with_detail(ContextDetail::Contrast {
                            foreground: foreground.to_hex(),
                            background: bg_hex,
                            ratio: shown_ratio,
                            required_ratio: result.required_ratio,
                            font_size,
                            font_weight,
                            large_text,
                            level: result.level.to_string(),
                        }),
                )
                .with_wcag(if opts.wcag_level == WcagLevel::AAA {
                    "1.4.6"
                } else {
                    "1.4.3"
                }),
            );
        }
    }

    Ok(CheckOutput::new(findings, data))
}

fn dedupe_key(fg: &str, bg: &str, font_size: f64, font_weight: u16) -> (String, String, i64, u16) {
    (fg.to_string(), bg.to_string(), font_size.round() as i64, font_weight)
}

fn manual_review(
    page: &dyn PageSnapshot,
    node: NodeId,
    text: &str,
    foreground: &str,
    image: &str,
) -> Result<Finding> {
    Ok(Finding::new(
        Category::Contrast,
        "contrast_manual_review",
        Severity::High,
        "Text is placed over a background image; contrast cannot be computed",
        "Check contrast manually, or add a dark overlay (at least 55% opacity) behind the text.",
        FindingContext::new(selector_for(page, node)?)
            .with_text(text)
            .with_detail(ContextDetail::ContrastReview {
                foreground: foreground.to_string(),
                background_image: image.to_string(),
            }),
    )
    .with_wcag("1.4.3"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::{bbox, page, types};
    use serde_json::json;

    fn text(tag: &str, color: &str, body: &str) -> serde_json::Value {
        json!({"tag": tag, "text": body, "style": {"color": color, "font-size": "16px"},
               "bbox": bbox(0.0, 0.0, 100.0, 20.0)})
    }

    #[test]
    fn low_contrast_text_is_critical() {
        let p = page(json!({"tag": "body", "children": [
            text("p", "#999999", "Faint"),
            text("p", "#767676", "Just enough")
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert_eq!(types(&out.findings), ["insufficient_contrast"]);
        let f = &out.findings[0];
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.context.text_sample.as_deref(), Some("Faint"));
        assert_eq!(out.data.checks.len(), 2);
        assert_eq!(out.data.passes(), 1);
        assert_eq!(out.data.pairs.len(), 2);
    }

    #[test]
    fn aaa_level_raises_the_bar() {
        let p = page(json!({"tag": "body", "children": [text("p", "#767676", "Gray")]}));
        let opts = AuditOptions {
            wcag_level: WcagLevel::AAA,
            ..AuditOptions::default()
        };
        let out = check(&p, &opts).expect("check");
        assert_eq!(types(&out.findings), ["insufficient_contrast"]);
        assert_eq!(out.findings[0].wcag.as_deref(), Some("1.4.6"));
    }

    #[test]
    fn identical_combinations_are_deduplicated() {
        let p = page(json!({"tag": "body", "children": [
            text("p", "#999999", "One"),
            text("p", "#999999", "Two"),
            text("span", "#999999", "Three")
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert_eq!(out.findings.len(), 1);
        assert_eq!(out.data.checks.len(), 1);
    }

    #[test]
    fn translucent_text_is_composited_onto_background() {
        let p = page(json!({"tag": "body", "children": [
            text("p", "rgba(0, 0, 0, 0.3)", "Ghost")
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert_eq!(types(&out.findings), ["insufficient_contrast"]);
        assert_eq!(out.data.checks[0].foreground, "#b3b3b3");
    }

    #[test]
    fn hidden_and_textless_elements_are_skipped() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "p", "text": "Hidden", "style": {"color": "#eeeeee", "visibility": "hidden"},
             "bbox": bbox(0.0, 0.0, 10.0, 10.0)},
            {"tag": "p", "text": "   ", "style": {"color": "#eeeeee"}, "bbox": bbox(0.0, 0.0, 10.0, 10.0)},
            {"tag": "p", "text": "No box", "style": {"color": "#eeeeee"}}
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert!(out.findings.is_empty());
        assert!(out.data.checks.is_empty());
    }

    #[test]
    fn text_over_image_without_overlay_needs_manual_review() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "section", "style": {"background-image": "url(hero.jpg)"}, "children": [
                text("h1", "#ffffff", "Welcome")
            ]}
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert_eq!(types(&out.findings), ["contrast_manual_review"]);
        assert_eq!(out.findings[0].severity, Severity::High);
        assert!(out.data.checks.is_empty());
    }

    #[test]
    fn text_over_image_with_dark_overlay_is_scored() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "section",
             "style": {"background-image": "linear-gradient(rgba(0,0,0,0.7), rgba(0,0,0,0.7)), url(hero.jpg)"},
             "children": [text("h1", "#ffffff", "Welcome")]}
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert!(out.findings.is_empty());
        assert_eq!(out.data.checks.len(), 1);
        assert_eq!(out.data.checks[0].background, "#4d4d4d");
        assert_eq!(out.data.checks[0].passes, Some(true));
    }

    #[test]
    fn unparseable_color_is_recorded_as_error() {
        let p = page(json!({"tag": "body", "children": [
            text("p", "color(display-p3 0 0 0)", "Wide gamut")
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert!(out.findings.is_empty());
        assert_eq!(out.data.checks.len(), 1);
        assert!(out.data.checks[0].error.is_some());
        assert_eq!(out.data.checks[0].ratio, None);
    }
}
