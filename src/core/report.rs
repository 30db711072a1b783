use std::collections::BTreeMap;

use crate::checks::{ContrastCheck, HeadingEntry, TabStop};
use crate::color::WcagLevel;
use crate::core::{Category, Finding, Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOptions {
    pub wcag_level: WcagLevel,
    pub skip_contrast: bool,
    pub skip_images: bool,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            wcag_level: WcagLevel::AA,
            skip_contrast: false,
            skip_images: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total_issues: usize,
    pub critical_issues: usize,
    pub warnings: usize,
    pub passes: usize,
    pub compliance_level: String,
}

impl AuditSummary {
    pub const COMPLIANT: &'static str = "Compliant";
    pub const NON_COMPLIANT: &'static str = "Non-compliant";

    /// Counts only findings that are not ignored.
    pub fn compute<'a>(findings: impl IntoIterator<Item = &'a Finding>, passes: usize) -> Self {
        let mut total_issues = 0;
        let mut critical_issues = 0;
        for finding in findings {
            if finding.ignored {
                continue;
            }
            total_issues += 1;
            if finding.severity == Severity::Critical {
                critical_issues += 1;
            }
        }
        Self {
            total_issues,
            critical_issues,
            warnings: total_issues - critical_issues,
            passes,
            compliance_level: if critical_issues == 0 {
                Self::COMPLIANT.to_string()
            } else {
                Self::NON_COMPLIANT.to_string()
            },
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.critical_issues == 0
    }
}

/// Supplementary data gathered by the passes, kept next to the findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditData {
    pub landmarks: BTreeMap<String, usize>,
    pub headings: Vec<HeadingEntry>,
    pub contrast_checks: Vec<ContrastCheck>,
    pub tab_order: Vec<TabStop>,
}

/// Result of auditing one page snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub url: String,
    pub findings: BTreeMap<Category, Vec<Finding>>,
    pub data: AuditData,
    pub summary: AuditSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl AuditResult {
    pub fn all_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.values().flatten()
    }

    pub fn findings_for(&self, category: Category) -> &[Finding] {
        self.findings
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn ignored_count(&self) -> usize {
        self.all_findings().filter(|f| f.ignored).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadError {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub pages: usize,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub warnings: usize,
    pub ignored: usize,
    pub compliant_pages: usize,
    pub notes: Vec<String>,
}

/// Everything one `audit` invocation produced, across all snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub schema_version: String,
    pub tool_version: String,
    pub generated_at: String,
    pub options: AuditOptions,
    pub summary: RunSummary,
    pub pages: Vec<AuditResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_errors: Vec<LoadError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FindingContext;

    fn finding(severity: Severity, ignored: bool) -> Finding {
        Finding {
            ignored,
            ..Finding::new(
                Category::Aria,
                "missing_accessible_name",
                severity,
                "m",
                "r",
                FindingContext::new("button"),
            )
        }
    }

    #[test]
    fn summary_excludes_ignored_findings() {
        let findings = vec![
            finding(Severity::Critical, false),
            finding(Severity::Critical, true),
            finding(Severity::Medium, false),
            finding(Severity::Low, true),
        ];
        let summary = AuditSummary::compute(&findings, 3);
        assert_eq!(summary.total_issues, 2);
        assert_eq!(summary.critical_issues, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.passes, 3);
        assert_eq!(summary.compliance_level, AuditSummary::NON_COMPLIANT);
    }

    #[test]
    fn summary_is_compliant_when_only_critical_findings_are_ignored() {
        let findings = vec![finding(Severity::Critical, true), finding(Severity::High, false)];
        let summary = AuditSummary::compute(&findings, 0);
        assert!(summary.is_compliant());
        assert_eq!(summary.compliance_level, "Compliant");
    }

    #[test]
    fn summary_uses_camel_case_keys() {
        let v = serde_json::to_value(AuditSummary::compute(&[], 0)).expect("serialize");
        for key in ["totalIssues", "criticalIssues", "warnings", "passes", "complianceLevel"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
    }
}
