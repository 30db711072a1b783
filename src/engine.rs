use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::checks::{self, CheckOutput};
use crate::core::{
    AuditData, AuditOptions, AuditResult, AuditSummary, Category, Finding, LoadError, RunReport,
    RunSummary,
};
use crate::page::{PageSnapshot, StaticPage};
use crate::suppress::RuleSet;

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub audit: AuditOptions,
    pub exclude: Vec<String>,
    pub show_progress: bool,
}

#[derive(Debug, Clone)]
pub struct Engine {
    opts: EngineOptions,
    rules: RuleSet,
}

impl Engine {
    pub fn new(opts: EngineOptions, rules: RuleSet) -> Self {
        Self { opts, rules }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.opts
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn audit(&self, page: &dyn PageSnapshot) -> AuditResult {
        audit_page(page, &self.opts.audit, &self.rules, OffsetDateTime::now_utc())
    }

    /// Audits every snapshot under `paths`, one page at a time.
    pub fn run(&self, paths: &[PathBuf]) -> Result<RunReport> {
        let discovery = crate::discover::snapshot_files(paths, &self.opts.exclude)?;
        let mut load_errors = discovery.errors;
        let mut pages = Vec::new();

        use std::io::IsTerminal;
        let progress_enabled = self.opts.show_progress && std::io::stderr().is_terminal();
        let pb = if progress_enabled {
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let now = OffsetDateTime::now_utc();
        for (i, path) in discovery.files.iter().enumerate() {
            if let Some(pb) = &pb {
                pb.set_message(format!(
                    "auditing {} ({}/{})",
                    path.display(),
                    i + 1,
                    discovery.files.len()
                ));
            }
            match StaticPage::load(path) {
                Ok(page) => pages.push(audit_page(&page, &self.opts.audit, &self.rules, now)),
                Err(err) => load_errors.push(LoadError {
                    path: path.display().to_string(),
                    error: format!("{err:#}"),
                }),
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let mut notes = self.rules.notes.clone();
        if discovery.files.is_empty() {
            notes.push("no snapshot files found".to_string());
        }
        notes.sort();
        notes.dedup();

        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        Ok(RunReport {
            schema_version: SCHEMA_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at,
            options: self.opts.audit,
            summary: run_summary(&pages, notes),
            pages,
            load_errors,
        })
    }
}

fn run_summary(pages: &[AuditResult], notes: Vec<String>) -> RunSummary {
    let mut summary = RunSummary {
        pages: pages.len(),
        total_issues: 0,
        critical_issues: 0,
        warnings: 0,
        ignored: 0,
        compliant_pages: 0,
        notes,
    };
    for page in pages {
        summary.total_issues += page.summary.total_issues;
        summary.critical_issues += page.summary.critical_issues;
        summary.warnings += page.summary.warnings;
        summary.ignored += page.ignored_count();
        if page.summary.is_compliant() {
            summary.compliant_pages += 1;
        }
    }
    summary
}

/// Runs every pass over one page, then assigns IDs, applies the ignore
/// rules and computes the summary.
///
/// A pass that fails contributes no findings and leaves a diagnostic; the
/// remaining passes still run.
pub fn audit_page(
    page: &dyn PageSnapshot,
    opts: &AuditOptions,
    rules: &RuleSet,
    now: OffsetDateTime,
) -> AuditResult {
    let mut diagnostics = Vec::new();
    let mut data = AuditData::default();
    let mut findings: BTreeMap<Category, Vec<Finding>> =
        Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
    let mut collect = |category: Category, mut out: Vec<Finding>| {
        findings.entry(category).or_default().append(&mut out);
    };

    let structure = phase("structure", &mut diagnostics, || {
        checks::structure::check(page, opts)
    });
    data.landmarks = structure.data.landmarks;
    data.headings = structure.data.headings;
    collect(Category::Structure, structure.findings);

    let mut passes = 0;
    if !opts.skip_contrast {
        let contrast = phase("contrast", &mut diagnostics, || {
            checks::contrast::check(page, opts)
        });
        passes = contrast.data.passes();
        let vision = checks::vision::check(&contrast.data.pairs);
        data.contrast_checks = contrast.data.checks;
        collect(Category::Contrast, contrast.findings);
        collect(Category::Vision, vision.findings);
    }

    let aria = phase("aria", &mut diagnostics, || checks::aria::check(page, opts));
    collect(Category::Aria, aria.findings);

    let keyboard = phase("keyboard", &mut diagnostics, || {
        checks::keyboard::check(page, opts)
    });
    collect(Category::Keyboard, keyboard.findings);

    if !opts.skip_images {
        let images = phase("images", &mut diagnostics, || {
            checks::images::check(page, opts)
        });
        collect(Category::Images, images.findings);
    }

    let focus_style = phase("focus_style", &mut diagnostics, || {
        checks::focus_style::check(page, opts)
    });
    collect(Category::FocusStyle, focus_style.findings);

    let touch = phase("touch_targets", &mut diagnostics, || {
        checks::touch_targets::check(page, opts)
    });
    collect(Category::TouchTargets, touch.findings);

    let focus_order = phase("focus_order", &mut diagnostics, || {
        checks::focus_order::check(page, opts)
    });
    data.tab_order = focus_order.data;
    collect(Category::FocusOrder, focus_order.findings);

    let url = page.url().to_string();
    for list in findings.values_mut() {
        for finding in list.iter_mut() {
            finding.url = url.clone();
            crate::identity::assign(finding);
        }
        rules.apply(list, now);
    }

    let summary = AuditSummary::compute(findings.values().flatten(), passes);
    AuditResult {
        url,
        findings,
        data,
        summary,
        diagnostics,
    }
}

fn phase<T: Default>(
    name: &str,
    diagnostics: &mut Vec<String>,
    run: impl FnOnce() -> Result<CheckOutput<T>>,
) -> CheckOutput<T> {
    match run() {
        Ok(out) => out,
        Err(err) => {
            diagnostics.push(format!("{name}: {err:#}"));
            CheckOutput::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;
    use crate::page::{ComputedStyle, NodeId, Pseudo, Rect};
    use crate::suppress::IgnoreRule;
    use serde_json::json;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-03-10 12:00 UTC);

    fn snapshot() -> StaticPage {
        let doc = json!({"url": "https://example.com/", "document": {"tag": "html", "children": [
            {"tag": "body", "style": {"background-color": "#ffffff"}, "children": [
                {"tag": "a", "attributes": {"href": "#main", "class": "skip"}, "text": "Skip to content",
                 "bbox": {"x": 0, "y": 0, "width": 120, "height": 48},
                 "focus_style": {"outline-style": "solid"}},
                {"tag": "nav", "children": [
                    {"tag": "a", "attributes": {"href": "/"}, "text": "Home",
                     "bbox": {"x": 0, "y": 50, "width": 80, "height": 48},
                     "focus_style": {"outline-style": "solid"}}
                ]},
                {"tag": "main", "attributes": {"id": "main"}, "children": [
                    {"tag": "h1", "text": "Welcome", "style": {"color": "#222222", "font-size": "32px"},
                     "bbox": {"x": 0, "y": 120, "width": 600, "height": 40}},
                    {"tag": "img", "attributes": {"src": "hero.jpg"},
                     "bbox": {"x": 0, "y": 170, "width": 600, "height": 300}}
                ]}
            ]}
        ]}});
        StaticPage::from_json(&doc.to_string()).expect("snapshot")
    }

    #[test]
    fn missing_alt_text_is_suppressed_by_selector() {
        let page = snapshot();
        let opts = AuditOptions::default();

        let result = audit_page(&page, &opts, &RuleSet::empty(), NOW);
        let images = result.findings_for(Category::Images);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].finding_type, "missing_alt_text");
        assert_eq!(images[0].severity, Severity::Critical);
        assert_eq!(result.summary.critical_issues, 1);
        let selector = images[0].selector().to_string();

        let rules = RuleSet::new(vec![IgnoreRule {
            selector: Some(selector),
            ..IgnoreRule::default()
        }]);
        let result = audit_page(&page, &opts, &rules, NOW);
        let images = result.findings_for(Category::Images);
        assert_eq!(images.len(), 1);
        assert!(images[0].ignored);
        assert_eq!(result.summary.critical_issues, 0);
        assert_eq!(result.summary.compliance_level, "Compliant");
        assert_eq!(result.ignored_count(), 1);
    }

    #[test]
    fn findings_get_url_and_stable_ids() {
        let page = snapshot();
        let a = audit_page(&page, &AuditOptions::default(), &RuleSet::empty(), NOW);
        let b = audit_page(&page, &AuditOptions::default(), &RuleSet::empty(), NOW);
        let ids_a: Vec<_> = a.all_findings().map(|f| f.id.clone()).collect();
        let ids_b: Vec<_> = b.all_findings().map(|f| f.id.clone()).collect();
        assert!(!ids_a.is_empty());
        assert_eq!(ids_a, ids_b);
        assert!(a.all_findings().all(|f| f.url == "https://example.com/"));
        assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
    }

    #[test]
    fn supplementary_data_is_collected() {
        let result = audit_page(&snapshot(), &AuditOptions::default(), &RuleSet::empty(), NOW);
        assert_eq!(result.data.landmarks.get("main"), Some(&1));
        assert_eq!(result.data.headings.len(), 1);
        assert_eq!(result.data.tab_order.len(), 2);
        assert_eq!(result.data.contrast_checks.len(), 2);
        assert_eq!(result.summary.passes, 2);
        assert_eq!(result.findings.len(), Category::ALL.len());
    }

    #[test]
    fn skip_flags_disable_their_passes() {
        let opts = AuditOptions {
            skip_contrast: true,
            skip_images: true,
            ..AuditOptions::default()
        };
        let result = audit_page(&snapshot(), &opts, &RuleSet::empty(), NOW);
        assert!(result.findings_for(Category::Images).is_empty());
        assert!(result.data.contrast_checks.is_empty());
        assert_eq!(result.summary.passes, 0);
    }

    /// Delegates to a static page but cannot read `:focus` styles.
    struct FlakyFocus(StaticPage);

    impl PageSnapshot for FlakyFocus {
        fn url(&self) -> &str {
            self.0.url()
        }
        fn elements(&self) -> Vec<NodeId> {
            self.0.elements()
        }
        fn tag_name(&self, node: NodeId) -> Result<String> {
            self.0.tag_name(node)
        }
        fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
            self.0.attribute(node, name)
        }
        fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
            self.0.parent(node)
        }
        fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
            self.0.children(node)
        }
        fn direct_text(&self, node: NodeId) -> Result<String> {
            self.0.direct_text(node)
        }
        fn text_content(&self, node: NodeId) -> Result<String> {
            self.0.text_content(node)
        }
        fn computed_style(&self, node: NodeId, pseudo: Pseudo) -> Result<ComputedStyle> {
            self.0.computed_style(node, pseudo)
        }
        fn focus_style(&self, _node: NodeId) -> Result<Option<ComputedStyle>> {
            anyhow::bail!("node detached")
        }
        fn bounding_box(&self, node: NodeId) -> Result<Option<Rect>> {
            self.0.bounding_box(node)
        }
    }

    #[test]
    fn failing_phase_is_isolated() {
        let page = FlakyFocus(snapshot());
        let result = audit_page(&page, &AuditOptions::default(), &RuleSet::empty(), NOW);
        assert_eq!(result.diagnostics, vec!["focus_style: node detached".to_string()]);
        assert!(result.findings_for(Category::FocusStyle).is_empty());
        assert_eq!(result.findings_for(Category::Images).len(), 1);
        assert_eq!(result.data.tab_order.len(), 2);
    }

    #[test]
    fn run_summary_adds_up_pages() {
        let page = audit_page(&snapshot(), &AuditOptions::default(), &RuleSet::empty(), NOW);
        let summary = run_summary(&[page.clone(), page], vec![]);
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.critical_issues, 2);
        assert_eq!(summary.compliant_pages, 0);
    }

    #[test]
    fn sibling_list_links_get_distinct_ids_and_suppress_separately() {
        let doc = json!({"url": "https://example.com/", "document": {"tag": "html", "children": [
            {"tag": "body", "children": [
                {"tag": "nav", "children": [{"tag": "ul", "children": [
                    {"tag": "li", "children": [{"tag": "a", "attributes": {"href": "/a", "class": "icon"}}]},
                    {"tag": "li", "children": [{"tag": "a", "attributes": {"href": "/b", "class": "icon"}}]}
                ]}]}
            ]}
        ]}});
        let page = StaticPage::from_json(&doc.to_string()).expect("snapshot");
        let result = audit_page(&page, &AuditOptions::default(), &RuleSet::empty(), NOW);
        let aria = result.findings_for(Category::Aria);
        assert_eq!(aria.len(), 2);
        assert_ne!(aria[0].selector(), aria[1].selector());
        assert_ne!(aria[0].id, aria[1].id);

        let rules = RuleSet::new(vec![IgnoreRule {
            id: aria[0].id.clone(),
            ..IgnoreRule::default()
        }]);
        let result = audit_page(&page, &AuditOptions::default(), &rules, NOW);
        let ignored: Vec<bool> = result
            .findings_for(Category::Aria)
            .iter()
            .map(|f| f.ignored)
            .collect();
        assert_eq!(ignored, vec![true, false]);
    }
}
