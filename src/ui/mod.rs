use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::{AuditResult, Finding, RunReport, Severity};
use crate::suppress::RuleSet;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(stderr, "  - rerun with `--verbose` for per-page diagnostics");
    let _ = writeln!(
        stderr,
        "  - see `a11ysweep --help` for available commands and options"
    );
}

pub fn print_audit(report: &RunReport, cfg: &UiConfig, top_n: usize) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_audit(&mut out, report, cfg, top_n);
}

pub fn write_audit(out: &mut dyn Write, report: &RunReport, cfg: &UiConfig, top_n: usize) {
    let s = &report.summary;
    let _ = writeln!(
        out,
        "Summary: pages={} (WCAG {})  issues={}  critical={}  warnings={}  ignored={}  compliant={}/{}",
        s.pages,
        report.options.wcag_level,
        s.total_issues,
        s.critical_issues,
        s.warnings,
        s.ignored,
        s.compliant_pages,
        s.pages
    );
    for note in &s.notes {
        let _ = writeln!(out, "- {note}");
    }
    for err in &report.load_errors {
        let _ = writeln!(out, "- could not load {}: {}", err.path, err.error);
    }

    if report.pages.is_empty() {
        return;
    }

    let _ = writeln!(out);
    print_pages_table(out, &report.pages, cfg.color);

    if cfg.verbose {
        for page in report.pages.iter().filter(|p| !p.diagnostics.is_empty()) {
            let _ = writeln!(out);
            let _ = writeln!(out, "Diagnostics for {}:", page.url);
            for d in &page.diagnostics {
                let _ = writeln!(out, "  - {d}");
            }
        }
    }

    let mut active: Vec<&Finding> = report
        .pages
        .iter()
        .flat_map(AuditResult::all_findings)
        .filter(|f| !f.ignored)
        .collect();
    active.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.url.cmp(&b.url))
    });

    let total = active.len();
    let rows = cfg.max_table_rows.min(top_n).min(total);
    let _ = writeln!(out);
    if total == 0 {
        let _ = writeln!(out, "No active findings.");
        return;
    }
    if total > rows {
        let _ = writeln!(out, "Top findings ({rows} shown of {total}):");
    } else {
        let _ = writeln!(out, "Top findings ({rows} shown):");
    }
    print_findings_table(out, &active, rows, report.pages.len() > 1, cfg.color);
}

fn print_pages_table(out: &mut dyn Write, pages: &[AuditResult], color: bool) {
    let label_url = "Page";
    let url_w = pages
        .iter()
        .map(|p| visible_width_ansi(&truncate_middle(&p.url, 60)))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_url));

    let _ = writeln!(
        out,
        "{}  {:>6}  {:>8}  {:>7}  Status",
        pad_end_display(label_url, url_w),
        "Issues",
        "Critical",
        "Ignored"
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}  {}",
        "-".repeat(url_w),
        "-".repeat(6),
        "-".repeat(8),
        "-".repeat(7),
        "-".repeat(13)
    );
    for page in pages {
        let status = format_status(&page.summary.compliance_level, page.summary.is_compliant(), color);
        let _ = writeln!(
            out,
            "{}  {:>6}  {:>8}  {:>7}  {status}",
            pad_end_display(&truncate_middle(&page.url, 60), url_w),
            page.summary.total_issues,
            page.summary.critical_issues,
            page.ignored_count(),
        );
    }
}

fn print_findings_table(
    out: &mut dyn Write,
    findings: &[&Finding],
    rows: usize,
    show_url: bool,
    color: bool,
) {
    let label_severity = "Severity";
    let label_id = "Id";
    let label_type = "Type";

    let severity_w = visible_width_ansi(label_severity);
    let id_w = 8usize.max(visible_width_ansi(label_id));
    let type_w = findings
        .iter()
        .take(rows)
        .map(|f| visible_width_ansi(&f.finding_type))
        .max()
        .unwrap_or(0)
        .max(visible_width_ansi(label_type));

    let _ = writeln!(
        out,
        "{}  {}  {}  Where",
        pad_end_display(label_severity, severity_w),
        pad_end_display(label_id, id_w),
        pad_end_display(label_type, type_w),
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        "-".repeat(severity_w),
        "-".repeat(id_w),
        "-".repeat(type_w),
        "-".repeat(5)
    );

    for finding in findings.iter().take(rows) {
        let severity = pad_end_ansi(&format_severity(finding.severity, color), severity_w);
        let id = pad_end_display(finding.id.as_deref().unwrap_or("-"), id_w);
        let kind = pad_end_display(&finding.finding_type, type_w);
        let place = if show_url {
            format!(
                "{} @ {}",
                truncate_middle(finding.selector(), 48),
                truncate_middle(&finding.url, 40)
            )
        } else {
            truncate_middle(finding.selector(), 72)
        };
        let _ = writeln!(out, "{severity}  {id}  {kind}  {place}");
        let _ = writeln!(
            out,
            "{}  {}",
            " ".repeat(severity_w + 2 + id_w + 2 + type_w),
            finding.message
        );
    }
}

pub fn print_rules_check(rules: &RuleSet, expired: usize, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    match &rules.source {
        Some(path) => {
            let _ = writeln!(out, "Ignore file: {}", path.display());
        }
        None => {
            let _ = writeln!(out, "Ignore file: (none)");
        }
    }
    let _ = writeln!(
        out,
        "Rules: active={}  expired={expired}  dropped={}",
        rules.len().saturating_sub(expired),
        rules.dropped.len()
    );
    for dropped in &rules.dropped {
        let _ = writeln!(out, "- rule #{} dropped: {}", dropped.index, dropped.reason);
    }
}

fn format_severity(severity: Severity, color: bool) -> String {
    let s = severity.as_str();
    if !color {
        return s.to_string();
    }

    let code = match severity {
        Severity::Low => "90",
        Severity::Medium => "33",
        Severity::High => "35",
        Severity::Critical => "31",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn format_status(label: &str, ok: bool, color: bool) -> String {
    if !color {
        return label.to_string();
    }
    let code = if ok { "32" } else { "31" };
    format!("\x1b[{code}m{label}\x1b[0m")
}

fn truncate_middle(s: &str, max_chars: usize) -> String {
    let len = s.chars().count();
    if len <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let left = keep / 2;
    let right = keep.saturating_sub(left);

    let prefix: String = s.chars().take(left).collect();
    let suffix: String = s.chars().skip(len - right).collect();

    format!("{prefix}...{suffix}")
}

fn pad_end_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_end_display(s: &str, width: usize) -> String {
    pad_end_ansi(s, width)
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}
