use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{CheckOutput, MAX_ELEMENTS, PAGE_SELECTOR};
use crate::core::{AuditOptions, Category, ContextDetail, Finding, FindingContext, Severity};
use crate::page::{NodeId, PageSnapshot, landmark_role, selector_for};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingEntry {
    pub level: u8,
    pub text: String,
    pub selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureData {
    pub landmarks: BTreeMap<String, usize>,
    pub headings: Vec<HeadingEntry>,
}

/// Landmark inventory and heading outline.
pub fn check(page: &dyn PageSnapshot, _opts: &AuditOptions) -> Result<CheckOutput<StructureData>> {
    let mut data = StructureData::default();
    let mut findings = Vec::new();

    for node in page.elements().into_iter().take(MAX_ELEMENTS) {
        if !page.is_rendered(node)? {
            continue;
        }
        if let Some(role) = landmark_role(page, node)? {
            *data.landmarks.entry(role.to_string()).or_insert(0) += 1;
        }
        if let Some(level) = heading_level(page, node)? {
            data.headings.push(HeadingEntry {
                level,
                text: crate::core::text_sample(&page.text_content(node)?),
                selector: selector_for(page, node)?,
            });
        }
    }

    if !data.landmarks.contains_key("main") {
        findings.push(
            Finding::new(
                Category::Structure,
                "missing_main_landmark",
                Severity::Critical,
                "Page has no main landmark",
                "Wrap the primary content in a <main> element (or role=\"main\").",
                FindingContext::new(PAGE_SELECTOR),
            )
            .with_wcag("1.3.1"),
        );
    }

    if !data.headings.iter().any(|h| h.level == 1) {
        findings.push(
            Finding::new(
                Category::Structure,
                "missing_h1",
                Severity::Critical,
                "Page has no top-level heading (h1)",
                "Add a single <h1> that describes the page content.",
                FindingContext::new(PAGE_SELECTOR),
            )
            .with_wcag("1.3.1"),
        );
    }

    if !data.landmarks.contains_key("navigation") {
        findings.push(
            Finding::new(
                Category::Structure,
                "missing_navigation",
                Severity::Medium,
                "Page has no navigation landmark",
                "Mark the main menu up with <nav> (or role=\"navigation\").",
                FindingContext::new(PAGE_SELECTOR),
            )
            .with_wcag("1.3.1"),
        );
    }

    let mut previous: u8 = 0;
    for heading in &data.headings {
        if previous > 0 && heading.level > previous + 1 {
            findings.push(
                Finding::new(
                    Category::Structure,
                    "heading_level_skipped",
                    Severity::Low,
                    format!(
                        "Heading level skipped: h{previous} followed by h{}",
                        heading.level
                    ),
                    format!("Use h{} here or restructure the outline.", previous + 1),
                    FindingContext::new(heading.selector.clone())
                        .with_text(&heading.text)
                        .with_detail(ContextDetail::Heading {
                            from_level: previous,
                            to_level: heading.level,
                        }),
                )
                .with_wcag("1.3.1"),
            );
        }
        previous = heading.level;
    }

    Ok(CheckOutput::new(findings, data))
}

fn heading_level(page: &dyn PageSnapshot, node: NodeId) -> Result<Option<u8>> {
    let tag = page.tag_name(node)?;
    if let Some(level) = tag
        .strip_prefix('h')
        .and_then(|d| d.parse::<u8>().ok())
        .filter(|l| (1..=6).contains(l))
    {
        return Ok(Some(level));
    }
    let is_heading_role = page
        .attribute(node, "role")?
        .is_some_and(|r| r.trim().eq_ignore_ascii_case("heading"));
    if !is_heading_role {
        return Ok(None);
    }
    let level = page
        .attribute(node, "aria-level")?
        .and_then(|l| l.trim().parse::<u8>().ok())
        .filter(|l| (1..=6).contains(l))
        .unwrap_or(2);
    Ok(Some(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::{page, types};
    use serde_json::json;

    #[test]
    fn empty_page_misses_all_structure() {
        let p = page(json!({"tag": "body"}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert_eq!(
            types(&out.findings),
            ["missing_main_landmark", "missing_h1", "missing_navigation"]
        );
        assert_eq!(out.findings[0].severity, Severity::Critical);
        assert_eq!(out.findings[2].severity, Severity::Medium);
    }

    #[test]
    fn well_structured_page_has_no_findings() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "header", "children": [{"tag": "nav"}]},
            {"tag": "main", "children": [
                {"tag": "h1", "text": "Title"},
                {"tag": "h2", "text": "Section"},
                {"tag": "h3", "text": "Sub"},
                {"tag": "h2", "text": "Next"}
            ]}
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert!(out.findings.is_empty(), "{:?}", types(&out.findings));
        assert_eq!(out.data.landmarks.get("banner"), Some(&1));
        assert_eq!(out.data.headings.len(), 4);
    }

    #[test]
    fn skipped_heading_level_is_low_severity() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "nav"},
            {"tag": "main", "children": [
                {"tag": "h1", "text": "Title"},
                {"tag": "h4", "text": "Deep"}
            ]}
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert_eq!(types(&out.findings), ["heading_level_skipped"]);
        let f = &out.findings[0];
        assert_eq!(f.severity, Severity::Low);
        assert_eq!(
            f.context.detail,
            ContextDetail::Heading { from_level: 1, to_level: 4 }
        );
        assert_eq!(f.context.text_sample.as_deref(), Some("Deep"));
    }

    #[test]
    fn aria_heading_and_hidden_landmarks() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "div", "attributes": {"role": "main"}, "children": [
                {"tag": "div", "attributes": {"role": "heading", "aria-level": "1"}, "text": "T"}
            ]},
            {"tag": "nav", "style": {"display": "none"}}
        ]}));
        let out = check(&p, &AuditOptions::default()).expect("check");
        assert_eq!(types(&out.findings), ["missing_navigation"]);
    }
}
