use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{CheckOutput, MAX_ELEMENTS, PAGE_SELECTOR};
use crate::core::{AuditOptions, Category, ContextDetail, Finding, FindingContext, Severity};
use crate::page::{NodeId, PageSnapshot, Rect, selector_for, tabindex};

/// Moving up the page by more than this between stops is a backward jump.
const MAX_BACKWARD_JUMP: f64 = 200.0;
/// Moving either way by more than this on the same line is a sideways jump.
const MAX_SIDEWAYS_JUMP: f64 = 400.0;
/// Vertical drift under which two stops count as the same line.
const SAME_LINE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabStop {
    pub position: usize,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabindex: Option<i32>,
}

struct Stop {
    node: NodeId,
    tabindex: Option<i32>,
    rect: Option<Rect>,
}

pub fn check(page: &dyn PageSnapshot, _opts: &AuditOptions) -> Result<CheckOutput<Vec<TabStop>>> {
    let mut stops = Vec::new();
    for node in page.focusable_elements()?.into_iter().take(MAX_ELEMENTS) {
        if !page.is_rendered(node)? {
            continue;
        }
        stops.push(Stop {
            node,
            tabindex: tabindex(page, node)?,
            rect: page.bounding_box(node)?.filter(|r| !r.is_empty()),
        });
    }

    if stops.is_empty() {
        let finding = Finding::new(
            Category::FocusOrder,
            "no_focusable_elements",
            Severity::Critical,
            "Page has no keyboard-focusable elements",
            "Make links and controls reachable with Tab; avoid tabindex=\"-1\" on them.",
            FindingContext::new(PAGE_SELECTOR),
        )
        .with_wcag("2.4.3");
        return Ok(CheckOutput::new(vec![finding], Vec::new()));
    }

    // Positive tabindex first, ascending; the sort is stable so ties keep
    // document order.
    stops.sort_by_key(|s| match s.tabindex {
        Some(t) if t > 0 => (0, t),
        _ => (1, 0),
    });

    let mut findings = Vec::new();
    let mut order = Vec::with_capacity(stops.len());
    let mut previous: Option<(&Stop, String)> = None;

    for (i, stop) in stops.iter().enumerate() {
        let position = i + 1;
        let selector = selector_for(page, stop.node)?;

        if let Some(t) = stop.tabindex.filter(|t| *t > 0) {
            findings.push(
                Finding::new(
                    Category::FocusOrder,
                    "positive_tabindex",
                    Severity::Medium,
                    format!("tabindex=\"{t}\" overrides the natural focus order"),
                    "Use tabindex=\"0\" and order the markup the way it should be read.",
                    FindingContext::new(selector.clone())
                        .with_text(&page.text_content(stop.node)?)
                        .with_detail(ContextDetail::FocusOrder {
                            position,
                            tabindex: Some(t),
                            previous_selector: None,
                        }),
                )
                .with_wcag("2.4.3"),
            );
        }

        if let Some((prev, prev_selector)) = &previous {
            if let (Some(from), Some(to)) = (prev.rect, stop.rect) {
                if let Some(direction) = jump(&from, &to) {
                    findings.push(
                        Finding::new(
                            Category::FocusOrder,
                            "illogical_focus_order",
                            Severity::Medium,
                            format!("Focus jumps {direction} from {prev_selector}"),
                            "Reorder the markup or remove tabindex so focus follows the visual layout.",
                            FindingContext::new(selector.clone())
                                .with_text(&page.text_content(stop.node)?)
                                .with_detail(ContextDetail::FocusOrder {
                                    position,
                                    tabindex: stop.tabindex,
                                    previous_selector: Some(prev_selector.clone()),
                                }),
                        )
                        .with_wcag("2.4.3"),
                    );
                }
            }
        }

        order.push(TabStop {
            position,
            selector: selector.clone(),
            tabindex: stop.tabindex,
        });
        previous = Some((stop, selector));
    }

    Ok(CheckOutput::new(findings, order))
}

fn jump(from: &Rect, to: &Rect) -> Option<&'static str> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dy < -MAX_BACKWARD_JUMP {
        Some("back up the page")
    } else if dx.abs() > MAX_SIDEWAYS_JUMP && dy.abs() < SAME_LINE {
        Some("sideways across the line")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::{bbox, page, types};
    use serde_json::json;

    fn link(class: &str, tabindex: Option<&str>, x: f64, y: f64) -> serde_json::Value {
        let mut attributes = json!({"href": "/", "class": class});
        if let Some(t) = tabindex {
            attributes["tabindex"] = json!(t);
        }
        json!({"tag": "a", "attributes": attributes, "text": class, "bbox": bbox(x, y, 80.0, 20.0)})
    }

    fn run(children: Vec<serde_json::Value>) -> CheckOutput<Vec<TabStop>> {
        check(&page(json!({"tag": "body", "children": children})), &AuditOptions::default())
            .expect("check")
    }

    #[test]
    fn natural_order_top_to_bottom_is_clean() {
        let out = run(vec![
            link("a", None, 0.0, 0.0),
            link("b", None, 100.0, 0.0),
            link("c", None, 0.0, 300.0),
        ]);
        assert!(out.findings.is_empty());
        let selectors: Vec<_> = out.data.iter().map(|s| s.selector.as_str()).collect();
        assert_eq!(selectors, ["a.a", "a.b", "a.c"]);
        assert_eq!(out.data[2].position, 3);
    }

    #[test]
    fn positive_tabindex_goes_first_and_is_flagged() {
        let out = run(vec![
            link("a", None, 0.0, 0.0),
            link("b", Some("2"), 0.0, 30.0),
            link("c", Some("1"), 0.0, 60.0),
            link("d", Some("-1"), 0.0, 90.0),
        ]);
        let selectors: Vec<_> = out.data.iter().map(|s| s.selector.as_str()).collect();
        assert_eq!(selectors, ["a.c", "a.b", "a.a"]);
        assert_eq!(
            types(&out.findings),
            ["positive_tabindex", "positive_tabindex"]
        );
    }

    #[test]
    fn backward_and_sideways_jumps_are_flagged() {
        let out = run(vec![
            link("low", Some("1"), 0.0, 800.0),
            link("top", None, 0.0, 0.0),
        ]);
        assert_eq!(
            types(&out.findings),
            ["positive_tabindex", "illogical_focus_order"]
        );

        let out = run(vec![link("right", None, 600.0, 0.0), link("left", None, 0.0, 50.0)]);
        assert_eq!(types(&out.findings), ["illogical_focus_order"]);
        match &out.findings[0].context.detail {
            ContextDetail::FocusOrder {
                previous_selector, ..
            } => assert_eq!(previous_selector.as_deref(), Some("a.right")),
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn rightward_jump_on_the_same_line_is_flagged() {
        let out = run(vec![link("left", None, 0.0, 0.0), link("far", None, 900.0, 10.0)]);
        assert_eq!(types(&out.findings), ["illogical_focus_order"]);

        let out = run(vec![link("left", None, 0.0, 0.0), link("near", None, 300.0, 10.0)]);
        assert!(out.findings.is_empty());

        let out = run(vec![link("left", None, 0.0, 0.0), link("below", None, 900.0, 150.0)]);
        assert!(out.findings.is_empty());
    }

    #[test]
    fn page_without_focusable_elements_is_critical() {
        let out = run(vec![json!({"tag": "p", "text": "Static"})]);
        assert_eq!(types(&out.findings), ["no_focusable_elements"]);
        assert_eq!(out.findings[0].severity, Severity::Critical);
        assert!(out.data.is_empty());
    }
}
