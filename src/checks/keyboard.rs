use anyhow::Result;

use super::{CheckOutput, MAX_ELEMENTS, PAGE_SELECTOR};
use crate::core::{AuditOptions, Category, Finding, FindingContext, Severity};
use crate::page::{NodeId, PageSnapshot, class_list, selector_for};

const SKIP_TEXT: [&str; 4] = ["skip", "jump to", "main content", "go to content"];
const SKIP_TARGETS: [&str; 5] = ["#main", "#content", "#main-content", "#maincontent", "#primary"];

pub fn check(page: &dyn PageSnapshot, _opts: &AuditOptions) -> Result<CheckOutput<()>> {
    let mut findings = Vec::new();
    let mut has_skip_link = false;

    for node in page.elements().into_iter().take(MAX_ELEMENTS) {
        if !has_skip_link && is_skip_link(page, node)? {
            has_skip_link = true;
        }
        if page.has_attribute(node, "onclick")?
            && page.is_rendered(node)?
            && !page.is_focusable(node)?
        {
            let tag = page.tag_name(node)?;
            findings.push(
                Finding::new(
                    Category::Keyboard,
                    "click_target_not_focusable",
                    Severity::Medium,
                    format!("<{tag}> handles clicks but cannot be reached with the keyboard"),
                    "Use a <button> or link, or add tabindex=\"0\" and a key handler.",
                    FindingContext::new(selector_for(page, node)?)
                        .with_text(&page.text_content(node)?),
                )
                .with_wcag("2.1.1"),
            );
        }
    }

    if !has_skip_link {
        findings.insert(
            0,
            Finding::new(
                Category::Keyboard,
                "missing_skip_link",
                Severity::Medium,
                "No skip link to bypass repeated navigation",
                "Add a \"Skip to main content\" link as the first focusable element.",
                FindingContext::new(PAGE_SELECTOR),
            )
            .with_wcag("2.4.1"),
        );
    }

    Ok(CheckOutput::new(findings, ()))
}

/// An in-page link whose text, class, id or target names a skip pattern.
fn is_skip_link(page: &dyn PageSnapshot, node: NodeId) -> Result<bool> {
    if page.tag_name(node)? != "a" {
        return Ok(false);
    }
    let Some(href) = page.attribute(node, "href")? else {
        return Ok(false);
    };
    let href = href.trim().to_ascii_lowercase();
    if !href.starts_with('#') || href.len() < 2 {
        return Ok(false);
    }
    if SKIP_TARGETS.contains(&href.as_str()) {
        return Ok(true);
    }
    let text = page.text_content(node)?.to_lowercase();
    if SKIP_TEXT.iter().any(|p| text.contains(p)) {
        return Ok(true);
    }
    let id = page.attribute(node, "id")?.unwrap_or_default();
    Ok(id.to_ascii_lowercase().contains("skip")
        || class_list(page, node)?
            .iter()
            .any(|c| c.to_ascii_lowercase().contains("skip")))
}
