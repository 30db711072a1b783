//! Ignore rules: human-curated suppressions applied after IDs are assigned.
//!
//! The store is a JSON document `{"version": 1, "rules": [...]}`. Loading for
//! an audit never fails: a missing or malformed store degrades to an empty
//! rule set and leaves a note for the run log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339};

use crate::core::{Finding, Severity};

pub const STORE_VERSION: u32 = 1;

const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Global,
    Domain,
    Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub finding_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_includes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_at_most: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl IgnoreRule {
    /// A rule must target something: an id, a domain or url scope with a
    /// pattern, a category, a type or a selector.
    pub fn validate(&self) -> Result<(), String> {
        let scoped = self.scope != Scope::Global && is_set(&self.pattern);
        let targeted = is_set(&self.id)
            || scoped
            || is_set(&self.category)
            || is_set(&self.finding_type)
            || is_set(&self.selector);
        if !targeted {
            return Err("rule has no id, url, domain, category, type or selector".to_string());
        }
        if self.scope != Scope::Global && !is_set(&self.pattern) {
            return Err(format!("scope {:?} requires a pattern", self.scope).to_lowercase());
        }
        if let Some(ceiling) = self.severity_at_most.as_deref() {
            if ceiling.trim() != WILDCARD {
                ceiling.parse::<Severity>()?;
            }
        }
        Ok(())
    }

    /// Only a parseable date in the past expires a rule. A bare date stays
    /// active through the whole day it names.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        let Some(expires) = self.expires.as_deref().map(str::trim) else {
            return false;
        };
        if let Ok(at) = OffsetDateTime::parse(expires, &Rfc3339) {
            return at < now;
        }
        if let Ok(day) = Date::parse(expires, format_description!("[year]-[month]-[day]")) {
            return day < now.date();
        }
        false
    }

    pub fn matches(&self, finding: &Finding, now: OffsetDateTime) -> bool {
        if self.is_expired(now) {
            return false;
        }
        if let (Some(id), Some(finding_id)) = (self.id.as_deref(), finding.id.as_deref()) {
            if id.trim().eq_ignore_ascii_case(finding_id) {
                return true;
            }
        }
        if !self.scope_matches(&finding.url) {
            return false;
        }
        if !field_matches(self.category.as_deref(), finding.category.as_str())
            || !field_matches(self.finding_type.as_deref(), &finding.finding_type)
        {
            return false;
        }
        if let Some(ceiling) = self.severity_at_most.as_deref().map(str::trim) {
            if ceiling != WILDCARD {
                match ceiling.parse::<Severity>() {
                    Ok(ceiling) if finding.severity.ordinal() <= ceiling.ordinal() => {}
                    _ => return false,
                }
            }
        }
        if let Some(selector) = self.selector.as_deref() {
            if !finding.selector().contains(selector) {
                return false;
            }
        }
        if let Some(needle) = self.text_includes.as_deref() {
            if !finding
                .text()
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }

    fn scope_matches(&self, url: &str) -> bool {
        match self.scope {
            Scope::Global => true,
            Scope::Url => self
                .pattern
                .as_deref()
                .is_some_and(|prefix| url.starts_with(prefix)),
            Scope::Domain => {
                let (Some(pattern), Some(host)) = (self.pattern.as_deref(), host_of(url)) else {
                    return false;
                };
                let pattern = pattern.trim().to_ascii_lowercase();
                let domain = pattern.strip_prefix("*.").unwrap_or(&pattern);
                host == domain || host.ends_with(&format!(".{domain}"))
            }
        }
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn field_matches(rule: Option<&str>, actual: &str) -> bool {
    match rule.map(str::trim) {
        None | Some("") | Some(WILDCARD) => true,
        Some(expected) => expected == actual,
    }
}

/// Lowercase host of an absolute URL, without userinfo or port.
pub fn host_of(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = if host.starts_with('[') {
        host.split_inclusive(']').next()?
    } else {
        host.split(':').next()?
    };
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

#[derive(Debug, Deserialize)]
struct RawStore {
    version: u32,
    #[serde(default)]
    rules: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRule {
    pub index: usize,
    pub reason: String,
}

/// Upper bound on active rules, so matching stays bounded per finding.
pub const MAX_RULES: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<IgnoreRule>,
    pub source: Option<PathBuf>,
    pub dropped: Vec<DroppedRule>,
    pub notes: Vec<String>,
    overflow: usize,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keeps the valid rules and records why the others were dropped.
    pub fn new(rules: Vec<IgnoreRule>) -> Self {
        let mut set = Self::default();
        for (index, rule) in rules.into_iter().enumerate() {
            set.push(index, rule);
        }
        set.note_overflow();
        set
    }

    fn push(&mut self, index: usize, rule: IgnoreRule) {
        match rule.validate() {
            Ok(()) if self.rules.len() >= MAX_RULES => self.overflow += 1,
            Ok(()) => self.rules.push(rule),
            Err(reason) => self.drop_rule(index, reason),
        }
    }

    fn note_overflow(&mut self) {
        if self.overflow > 0 {
            self.notes.push(format!(
                "ignore file has more than {MAX_RULES} rules; {} skipped",
                self.overflow
            ));
        }
    }

    fn drop_rule(&mut self, index: usize, reason: String) {
        self.notes
            .push(format!("ignore rule #{index} dropped: {reason}"));
        self.dropped.push(DroppedRule { index, reason });
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let raw: RawStore = serde_json::from_str(s).context("ignore file is not valid JSON")?;
        if raw.version != STORE_VERSION {
            bail!(
                "unsupported ignore file version {} (expected {STORE_VERSION})",
                raw.version
            );
        }
        let mut set = Self::default();
        for (index, value) in raw.rules.into_iter().enumerate() {
            match serde_json::from_value::<IgnoreRule>(value) {
                Ok(rule) => set.push(index, rule),
                Err(err) => set.drop_rule(index, err.to_string()),
            }
        }
        set.note_overflow();
        Ok(set)
    }

    /// Strict read: a missing or malformed file is an error.
    pub fn read(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ignore file: {}", path.display()))?;
        let mut set = Self::from_json(&s)
            .with_context(|| format!("failed to parse ignore file: {}", path.display()))?;
        set.source = Some(path.to_path_buf());
        Ok(set)
    }

    /// Lenient read used by audits.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            let mut set = Self::empty();
            set.notes
                .push(format!("ignore file not found: {}", path.display()));
            return set;
        }
        match Self::read(path) {
            Ok(set) => set,
            Err(err) => {
                let mut set = Self::empty();
                set.notes.push(format!("ignore file ignored: {err:#}"));
                set
            }
        }
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn expired(&self, now: OffsetDateTime) -> Vec<&IgnoreRule> {
        self.rules.iter().filter(|r| r.is_expired(now)).collect()
    }

    /// First rule in list order that matches.
    pub fn matching_rule(&self, finding: &Finding, now: OffsetDateTime) -> Option<&IgnoreRule> {
        self.rules.iter().find(|rule| rule.matches(finding, now))
    }

    /// Marks matched findings as ignored and returns how many were.
    pub fn apply(&self, findings: &mut [Finding], now: OffsetDateTime) -> usize {
        let mut ignored = 0;
        for finding in findings.iter_mut() {
            finding.ignored = self.matching_rule(finding, now).is_some();
            if finding.ignored {
                ignored += 1;
            }
        }
        ignored
    }
}
