use anyhow::Result;

use super::{CheckOutput, MAX_ELEMENTS};
use crate::core::{AuditOptions, Category, Finding, FindingContext, Severity};
use crate::page::{NodeId, PageSnapshot, selector_for};

/// `alt=""` is valid decorative markup; only a missing attribute is flagged.
pub fn check(page: &dyn PageSnapshot, _opts: &AuditOptions) -> Result<CheckOutput<()>> {
    let mut findings = Vec::new();

    for node in page.elements().into_iter().take(MAX_ELEMENTS) {
        if !is_image(page, node)? || !page.is_rendered(node)? {
            continue;
        }
        if page.has_attribute(node, "alt")? || is_decorative(page, node)? {
            continue;
        }
        let labelled = page
            .attribute(node, "aria-label")?
            .is_some_and(|l| !l.trim().is_empty())
            || page.has_attribute(node, "aria-labelledby")?;
        if labelled {
            continue;
        }
        let src = page.attribute(node, "src")?.unwrap_or_default();
        findings.push(
            Finding::new(
                Category::Images,
                "missing_alt_text",
                Severity::Critical,
                "Image has no alt attribute",
                "Describe the image in an alt attribute, or use alt=\"\" if it is decorative.",
                FindingContext::new(selector_for(page, node)?).with_text(&src),
            )
            .with_wcag("1.1.1"),
        );
    }

    Ok(CheckOutput::new(findings, ()))
}

fn is_image(page: &dyn PageSnapshot, node: NodeId) -> Result<bool> {
    Ok(match page.tag_name(node)?.as_str() {
        "img" => true,
        "input" => page
            .attribute(node, "type")?
            .is_some_and(|t| t.eq_ignore_ascii_case("image")),
        _ => false,
    })
}

fn is_decorative(page: &dyn PageSnapshot, node: NodeId) -> Result<bool> {
    Ok(page.attribute(node, "role")?.is_some_and(|r| {
        let r = r.trim().to_ascii_lowercase();
        r == "presentation" || r == "none"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::{page, types};
    use serde_json::json;

    #[test]
    fn only_missing_alt_is_flagged() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "img", "attributes": {"src": "logo.png", "class": "logo"}},
            {"tag": "img", "attributes": {"src": "spacer.gif", "alt": ""}},
            {"tag": "img", "attributes": {"src": "chart.png", "alt": "Sales by month"}},
            {"tag": "img", "attributes": {"src": "divider.png", "role": "presentation"}},
            {"tag": "img", "attributes": {"src": "avatar.png", "aria-label": "Avatar"}},
            {"tag": "input", "attributes": {"type": "image", "src": "go.png"}}
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert_eq!(types(&out.findings), ["missing_alt_text", "missing_alt_text"]);
        assert_eq!(out.findings[0].severity, Severity::Critical);
        assert_eq!(out.findings[0].selector(), "img.logo");
        assert_eq!(out.findings[0].context.text_sample.as_deref(), Some("logo.png"));
        assert_eq!(out.findings[1].wcag.as_deref(), Some("1.1.1"));
    }

    #[test]
    fn hidden_images_are_ignored() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "div", "style": {"display": "none"}, "children": [
                {"tag": "img", "attributes": {"src": "x.png"}}
            ]}
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert!(out.findings.is_empty());
    }
}
