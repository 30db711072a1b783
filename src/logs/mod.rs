use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{AuditOptions, RunReport};

#[derive(Debug, Serialize)]
struct AuditRunLog {
    schema_version: &'static str,
    tool_version: String,
    command: &'static str,
    started_at: String,
    finished_at: String,
    status: &'static str,
    options: AuditOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignore_file: Option<String>,
    active_rules: usize,
    pages: Vec<PageLog>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    load_errors: Vec<LoadErrorLog>,
}

#[derive(Debug, Serialize)]
struct PageLog {
    url: String,
    total_issues: usize,
    critical_issues: usize,
    ignored: usize,
    compliance_level: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LoadErrorLog {
    path: String,
    error: String,
}

pub fn logs_dir(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/a11ysweep/logs")
}

/// Ignore-file details recorded next to the run.
#[derive(Debug, Clone, Copy)]
pub struct RulesInfo<'a> {
    pub ignore_file: Option<&'a Path>,
    pub active_rules: usize,
}

pub fn write_audit_log(
    home_dir: &Path,
    started_at: OffsetDateTime,
    finished_at: OffsetDateTime,
    report: &RunReport,
    rules: RulesInfo<'_>,
) -> Result<PathBuf> {
    let dir = logs_dir(home_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let pid = std::process::id();
    let ts = finished_at.unix_timestamp_nanos();
    let path = dir.join(format!("audit-{pid}-{ts}.json"));

    let degraded = !report.load_errors.is_empty()
        || report.pages.iter().any(|p| !p.diagnostics.is_empty());

    let log = AuditRunLog {
        schema_version: "1.0",
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        command: "audit",
        started_at: format_ts(started_at),
        finished_at: format_ts(finished_at),
        status: if degraded { "partial_error" } else { "ok" },
        options: report.options,
        ignore_file: rules.ignore_file.map(|p| mask_home(p, home_dir)),
        active_rules: rules.active_rules,
        pages: report
            .pages
            .iter()
            .map(|p| PageLog {
                url: p.url.clone(),
                total_issues: p.summary.total_issues,
                critical_issues: p.summary.critical_issues,
                ignored: p.ignored_count(),
                compliance_level: p.summary.compliance_level.clone(),
                diagnostics: p.diagnostics.clone(),
            })
            .collect(),
        notes: report.summary.notes.clone(),
        load_errors: report
            .load_errors
            .iter()
            .map(|e| LoadErrorLog {
                path: mask_home(Path::new(&e.path), home_dir),
                error: e.error.clone(),
            })
            .collect(),
    };

    let buf = serde_json::to_vec_pretty(&log).context("failed to serialize log (JSON)")?;
    std::fs::write(&path, buf)
        .with_context(|| format!("failed to write log: {}", path.display()))?;
    Ok(path)
}

fn format_ts(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

fn mask_home(path: &Path, home_dir: &Path) -> String {
    let Ok(stripped) = path.strip_prefix(home_dir) else {
        return path.display().to_string();
    };
    let stripped = stripped.display().to_string();
    if stripped.is_empty() {
        "~".to_string()
    } else {
        format!("~/{stripped}")
    }
}
