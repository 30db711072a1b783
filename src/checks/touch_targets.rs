use std::collections::HashSet;

use anyhow::Result;

use super::CheckOutput;
use crate::core::{AuditOptions, Category, ContextDetail, Finding, FindingContext, Severity};
use crate::page::{NodeId, PageSnapshot, Rect, ancestors_inclusive, selector_for};

/// WCAG 2.5.8 minimum (AA).
pub const MIN_TARGET: f64 = 24.0;
/// WCAG 2.5.5 enhanced size (AAA).
pub const ENHANCED_TARGET: f64 = 44.0;
/// Undersized targets closer than this, edge to edge, are too close.
pub const MIN_SPACING: f64 = 8.0;
/// Pairwise spacing is only checked across this many targets.
const MAX_SPACING_TARGETS: usize = 1_000;

struct Target {
    node: NodeId,
    rect: Rect,
    selector: String,
    ancestors: HashSet<NodeId>,
}

impl Target {
    fn undersized(&self) -> bool {
        self.rect.width < ENHANCED_TARGET || self.rect.height < ENHANCED_TARGET
    }
}

pub fn check(page: &dyn PageSnapshot, _opts: &AuditOptions) -> Result<CheckOutput<()>> {
    let mut findings = Vec::new();
    let mut targets = Vec::new();

    for node in page.interactive_elements()? {
        if !page.is_visible(node)? || is_inline_link(page, node)? {
            continue;
        }
        let Some(rect) = page.bounding_box(node)? else {
            continue;
        };
        let selector = selector_for(page, node)?;

        let rule = if rect.width < MIN_TARGET || rect.height < MIN_TARGET {
            Some(&MINIMUM)
        } else if rect.width < ENHANCED_TARGET || rect.height < ENHANCED_TARGET {
            Some(&ENHANCED)
        } else {
            None
        };
        if let Some(rule) = rule {
            findings.push(rule.finding(&selector, &page.text_content(node)?, rect));
        }

        let ancestors = ancestors_inclusive(page, node)?.into_iter().collect();
        targets.push(Target {
            node,
            rect,
            selector,
            ancestors,
        });
    }

    targets.truncate(MAX_SPACING_TARGETS);
    for (i, a) in targets.iter().enumerate() {
        for b in &targets[i + 1..] {
            if !a.undersized() && !b.undersized() {
                continue;
            }
            if a.ancestors.contains(&b.node) || b.ancestors.contains(&a.node) {
                continue;
            }
            let gap = a.rect.gap_to(&b.rect);
            if gap >= MIN_SPACING {
                continue;
            }
            findings.push(
                Finding::new(
                    Category::TouchTargets,
                    "targets_too_close",
                    Severity::Low,
                    format!("Touch target is {gap:.0}px from {}", b.selector),
                    format!("Leave at least {MIN_SPACING}px between small targets, or enlarge them."),
                    FindingContext::new(a.selector.clone()).with_detail(
                        ContextDetail::TouchSpacing {
                            other_selector: b.selector.clone(),
                            gap,
                        },
                    ),
                )
                .with_wcag("2.5.8"),
            );
        }
    }

    Ok(CheckOutput::new(findings, ()))
}

struct SizeRule {
    finding_type: &'static str,
    severity: Severity,
    wcag: &'static str,
    level: &'static str,
    required: f64,
}

const MINIMUM: SizeRule = SizeRule {
    finding_type: "target_too_small",
    severity: Severity::Medium,
    wcag: "2.5.8",
    level: "AA",
    required: MIN_TARGET,
};

const ENHANCED: SizeRule = SizeRule {
    finding_type: "target_below_enhanced_size",
    severity: Severity::Low,
    wcag: "2.5.5",
    level: "AAA",
    required: ENHANCED_TARGET,
};

impl SizeRule {
    fn finding(&self, selector: &str, text: &str, rect: Rect) -> Finding {
        let required = self.required;
        Finding::new(
            Category::TouchTargets,
            self.finding_type,
            self.severity,
            format!(
                "Touch target is {:.0}x{:.0}px, below {required}x{required}px ({})",
                rect.width, rect.height, self.level
            ),
            format!("Make the target at least {required}x{required}px, for example with padding."),
            FindingContext::new(selector)
                .with_text(text)
                .with_detail(ContextDetail::TouchTarget {
                    width: rect.width,
                    height: rect.height,
                    level: self.level.to_string(),
                }),
        )
        .with_wcag(self.wcag)
    }
}

/// Links inside running text are exempt from target size.
fn is_inline_link(page: &dyn PageSnapshot, node: NodeId) -> Result<bool> {
    if page.tag_name(node)? != "a" {
        return Ok(false);
    }
    match page.parent(node)? {
        Some(parent) => Ok(page.tag_name(parent)? == "p"),
        None => Ok(false),
    }
}
