use anyhow::Result;

use super::{CheckOutput, MAX_ELEMENTS};
use crate::core::{AuditOptions, Category, ContextDetail, Finding, FindingContext, Severity};
use crate::page::{NodeId, PageSnapshot, ancestors_inclusive, selector_for};

/// WAI-ARIA 1.2 roles, abstract roles excluded.
const VALID_ROLES: &[&str] = &[
    "alert", "alertdialog", "application", "article", "banner", "blockquote", "button", "caption",
    "cell", "checkbox", "code", "columnheader", "combobox", "complementary", "contentinfo",
    "definition", "deletion", "dialog", "directory", "document", "emphasis", "feed", "figure",
    "form", "generic", "grid", "gridcell", "group", "heading", "img", "insertion", "link", "list",
    "listbox", "listitem", "log", "main", "marquee", "math", "menu", "menubar", "menuitem",
    "menuitemcheckbox", "menuitemradio", "meter", "navigation", "none", "note", "option",
    "paragraph", "presentation", "progressbar", "radio", "radiogroup", "region", "row",
    "rowgroup", "rowheader", "scrollbar", "search", "searchbox", "separator", "slider",
    "spinbutton", "status", "strong", "subscript", "superscript", "switch", "tab", "table",
    "tablist", "tabpanel", "term", "textbox", "time", "timer", "toolbar", "tooltip", "tree",
    "treegrid", "treeitem",
];

/// Prefixes used by component libraries for IDs minted at runtime.
const GENERATED_ID_PREFIXES: [&str; 8] = [
    ":r", "react-", "radix-", "headlessui-", "mui-", "ember", "yui_", "downshift-",
];

const REFERENCE_ATTRIBUTES: [&str; 2] = ["aria-labelledby", "aria-describedby"];

pub fn check(page: &dyn PageSnapshot, _opts: &AuditOptions) -> Result<CheckOutput<()>> {
    let mut findings = Vec::new();

    for node in page.elements().into_iter().take(MAX_ELEMENTS) {
        if !page.is_rendered(node)? {
            continue;
        }

        if page.is_interactive(node)? && accessible_name(page, node)?.is_none() {
            let tag = page.tag_name(node)?;
            findings.push(
                Finding::new(
                    Category::Aria,
                    "missing_accessible_name",
                    Severity::Medium,
                    format!("Interactive <{tag}> has no accessible name"),
                    "Give the control visible text, an aria-label, or an associated <label>.",
                    FindingContext::new(selector_for(page, node)?),
                )
                .with_wcag("4.1.2"),
            );
        }

        if let Some(expanded) = page.attribute(node, "aria-expanded")? {
            if !page.has_attribute(node, "aria-controls")? {
                findings.push(
                    Finding::new(
                        Category::Aria,
                        "aria_expanded_without_controls",
                        Severity::Low,
                        "aria-expanded is set without aria-controls",
                        "Point aria-controls at the element that expands or collapses.",
                        FindingContext::new(selector_for(page, node)?)
                            .with_text(&page.text_content(node)?)
                            .with_detail(ContextDetail::Aria {
                                attribute: "aria-expanded".to_string(),
                                value: expanded,
                            }),
                    )
                    .with_wcag("4.1.2"),
                );
            }
        }

        for attribute in REFERENCE_ATTRIBUTES {
            let Some(value) = page.attribute(node, attribute)? else {
                continue;
            };
            let mut missing = Vec::new();
            for id in value.split_whitespace() {
                if !looks_generated(id) && page.element_by_id(id)?.is_none() {
                    missing.push(id);
                }
            }
            if missing.is_empty() {
                continue;
            }
            findings.push(
                Finding::new(
                    Category::Aria,
                    "broken_aria_reference",
                    Severity::Medium,
                    format!("{attribute} references missing id(s): {}", missing.join(", ")),
                    "Reference the id of an element that exists on the page, or remove the attribute.",
                    FindingContext::new(selector_for(page, node)?).with_detail(ContextDetail::Aria {
                        attribute: attribute.to_string(),
                        value: value.clone(),
                    }),
                )
                .with_wcag("4.1.2"),
            );
        }

        if let Some(role) = page.attribute(node, "role")? {
            let valid = role
                .split_whitespace()
                .any(|r| VALID_ROLES.contains(&r.to_ascii_lowercase().as_str()));
            if !valid {
                findings.push(
                    Finding::new(
                        Category::Aria,
                        "invalid_aria_role",
                        Severity::Medium,
                        format!("\"{}\" is not a valid ARIA role", role.trim()),
                        "Use a role defined by WAI-ARIA, or remove the role attribute.",
                        FindingContext::new(selector_for(page, node)?).with_detail(
                            ContextDetail::Aria {
                                attribute: "role".to_string(),
                                value: role,
                            },
                        ),
                    )
                    .with_wcag("4.1.2"),
                );
            }
        }
    }

    Ok(CheckOutput::new(findings, ()))
}

/// A simplified accessible-name computation.
pub fn accessible_name(page: &dyn PageSnapshot, node: NodeId) -> Result<Option<String>> {
    if let Some(label) = non_blank(page.attribute(node, "aria-label")?) {
        return Ok(Some(label));
    }
    if let Some(ids) = page.attribute(node, "aria-labelledby")? {
        let mut parts = Vec::new();
        for id in ids.split_whitespace() {
            if let Some(target) = page.element_by_id(id)? {
                parts.push(page.text_content(target)?);
            }
        }
        if let Some(name) = non_blank(Some(parts.join(" "))) {
            return Ok(Some(name));
        }
    }

    let tag = page.tag_name(node)?;
    if tag == "input" {
        let kind = page
            .attribute(node, "type")?
            .unwrap_or_default()
            .to_ascii_lowercase();
        match kind.as_str() {
            "submit" | "reset" | "button" => {
                if let Some(value) = non_blank(page.attribute(node, "value")?) {
                    return Ok(Some(value));
                }
                if kind != "button" {
                    return Ok(Some(kind));
                }
            }
            "image" => {
                if let Some(alt) = non_blank(page.attribute(node, "alt")?) {
                    return Ok(Some(alt));
                }
            }
            _ => {}
        }
    }
    if matches!(tag.as_str(), "input" | "select" | "textarea") {
        if let Some(label) = associated_label(page, node)? {
            return Ok(Some(label));
        }
    }

    if let Some(text) = non_blank(Some(page.text_content(node)?)) {
        return Ok(Some(text));
    }
    if let Some(alt) = descendant_alt(page, node)? {
        return Ok(Some(alt));
    }
    Ok(non_blank(page.attribute(node, "title")?))
}

fn associated_label(page: &dyn PageSnapshot, node: NodeId) -> Result<Option<String>> {
    if let Some(id) = page.attribute(node, "id")? {
        for candidate in page.elements() {
            if page.tag_name(candidate)? == "label"
                && page.attribute(candidate, "for")?.as_deref() == Some(id.as_str())
            {
                if let Some(text) = non_blank(Some(page.text_content(candidate)?)) {
                    return Ok(Some(text));
                }
            }
        }
    }
    for ancestor in ancestors_inclusive(page, node)?.into_iter().skip(1) {
        if page.tag_name(ancestor)? == "label" {
            return Ok(non_blank(Some(page.text_content(ancestor)?)));
        }
    }
    Ok(None)
}

fn descendant_alt(page: &dyn PageSnapshot, node: NodeId) -> Result<Option<String>> {
    let mut stack = page.children(node)?;
    while let Some(child) = stack.pop() {
        if page.tag_name(child)? == "img" {
            if let Some(alt) = non_blank(page.attribute(child, "alt")?) {
                return Ok(Some(alt));
            }
        }
        stack.extend(page.children(child)?);
    }
    Ok(None)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// IDs minted by UI frameworks often do not exist in a static snapshot.
pub fn looks_generated(id: &str) -> bool {
    if GENERATED_ID_PREFIXES.iter().any(|p| id.starts_with(p)) {
        return true;
    }
    let mut run = 0;
    for c in id.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= 4 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::{bbox, nodes_with_tag, page, types};
    use serde_json::json;

    fn run(doc: serde_json::Value) -> Vec<Finding> {
        check(&page(doc), &AuditOptions::default())
            .expect("check")
            .findings
    }

    #[test]
    fn unnamed_button_is_flagged() {
        let findings = run(json!({"tag": "body", "children": [
            {"tag": "button", "attributes": {"class": "icon"}, "bbox": bbox(0.0, 0.0, 10.0, 10.0)},
            {"tag": "button", "text": "Save"},
            {"tag": "button", "attributes": {"aria-label": "Close"}},
            {"tag": "a", "attributes": {"href": "/"}, "children": [
                {"tag": "img", "attributes": {"alt": "Home"}}
            ]}
        ]}));
        assert_eq!(types(&findings), ["missing_accessible_name"]);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].selector(), "button.icon");
    }

    #[test]
    fn inputs_take_names_from_labels() {
        let findings = run(json!({"tag": "body", "children": [
            {"tag": "label", "attributes": {"for": "email"}, "text": "Email"},
            {"tag": "input", "attributes": {"id": "email", "type": "email"}},
            {"tag": "label", "text": "Name", "children": [{"tag": "input"}]},
            {"tag": "input", "attributes": {"type": "submit"}},
            {"tag": "input", "attributes": {"id": "q", "type": "search"}}
        ]}));
        assert_eq!(types(&findings), ["missing_accessible_name"]);
        assert_eq!(findings[0].selector(), "#q");
    }

    #[test]
    fn labelledby_resolves_referenced_text() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "h2", "attributes": {"id": "t"}, "text": "Filters"},
            {"tag": "div", "attributes": {"role": "button", "aria-labelledby": "t"}}
        ]}));
        let div = nodes_with_tag(&p, "div")[0];
        assert_eq!(
            accessible_name(&p, div).expect("name").as_deref(),
            Some("Filters")
        );
    }

    #[test]
    fn expanded_without_controls_is_advisory() {
        let findings = run(json!({"tag": "body", "children": [
            {"tag": "button", "text": "Menu", "attributes": {"aria-expanded": "false"}},
            {"tag": "button", "text": "More", "attributes": {"aria-expanded": "true", "aria-controls": "m"}},
            {"tag": "ul", "attributes": {"id": "m"}}
        ]}));
        assert_eq!(types(&findings), ["aria_expanded_without_controls"]);
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn broken_references_tolerate_generated_ids() {
        let findings = run(json!({"tag": "body", "children": [
            {"tag": "p", "attributes": {"id": "hint"}, "text": "Hint"},
            {"tag": "span", "attributes": {"aria-describedby": "hint :r1:"}},
            {"tag": "span", "attributes": {"aria-describedby": "radix-5 field-20231"}},
            {"tag": "span", "attributes": {"aria-describedby": "hint gone"}}
        ]}));
        assert_eq!(types(&findings), ["broken_aria_reference"]);
        assert!(findings[0].message.ends_with("gone"));
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let findings = run(json!({"tag": "body", "children": [
            {"tag": "div", "attributes": {"role": "navigation"}},
            {"tag": "div", "attributes": {"role": "switch checkbox"}, "text": "On"},
            {"tag": "div", "attributes": {"role": "hamburger"}}
        ]}));
        assert_eq!(types(&findings), ["invalid_aria_role"]);
    }

    #[test]
    fn generated_id_detection() {
        assert!(looks_generated(":r3:"));
        assert!(looks_generated("headlessui-menu-button-1"));
        assert!(looks_generated("item-12345"));
        assert!(!looks_generated("hint"));
        assert!(!looks_generated("step-123"));
    }
}
