use anyhow::Result;

use super::{CheckOutput, MAX_ELEMENTS};
use crate::core::{AuditOptions, Category, Finding, FindingContext, Severity};
use crate::page::{ComputedStyle, PageSnapshot, Pseudo, selector_for};

/// Properties whose change under `:focus` counts as a visible indicator.
const INDICATOR_PROPERTIES: [&str; 8] = [
    "outline-style",
    "outline-width",
    "outline-color",
    "border-color",
    "border-width",
    "border-style",
    "background-color",
    "box-shadow",
];

pub fn check(page: &dyn PageSnapshot, _opts: &AuditOptions) -> Result<CheckOutput<()>> {
    let mut findings = Vec::new();

    for node in page.focusable_elements()?.into_iter().take(MAX_ELEMENTS) {
        if !page.is_visible(node)? {
            continue;
        }
        let Some(focused) = page.focus_style(node)? else {
            continue;
        };
        let base = page.computed_style(node, Pseudo::None)?;
        if changed_properties(&base, &focused).next().is_some() {
            continue;
        }
        let tag = page.tag_name(node)?;
        findings.push(
            Finding::new(
                Category::FocusStyle,
                "missing_focus_indicator",
                Severity::Medium,
                format!("Focused <{tag}> looks the same as unfocused"),
                "Add a :focus or :focus-visible style, for example an outline or box-shadow.",
                FindingContext::new(selector_for(page, node)?)
                    .with_text(&page.text_content(node)?),
            )
            .with_wcag("2.4.7"),
        );
    }

    Ok(CheckOutput::new(findings, ()))
}

fn changed_properties<'a>(
    base: &'a ComputedStyle,
    focused: &'a ComputedStyle,
) -> impl Iterator<Item = &'static str> + 'a {
    INDICATOR_PROPERTIES
        .into_iter()
        .filter(move |p| normalized(base, p) != normalized(focused, p))
}

fn normalized(style: &ComputedStyle, property: &str) -> String {
    let value = style.get(property).unwrap_or(match property {
        "outline-style" | "border-style" | "box-shadow" => "none",
        "outline-width" | "border-width" => "0px",
        "background-color" => "transparent",
        _ => "",
    });
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}
