use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Finding severity. Ordering follows `low < medium < high < critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub const fn ordinal(self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("<=").unwrap_or(s).trim();
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!(
                "invalid severity: {s} (expected low|medium|high|critical)"
            )),
        }
    }
}

/// Which check pass produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Structure,
    Contrast,
    Vision,
    Aria,
    Keyboard,
    Images,
    FocusStyle,
    TouchTargets,
    FocusOrder,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Structure,
        Category::Contrast,
        Category::Vision,
        Category::Aria,
        Category::Keyboard,
        Category::Images,
        Category::FocusStyle,
        Category::TouchTargets,
        Category::FocusOrder,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Structure => "structure",
            Category::Contrast => "contrast",
            Category::Vision => "vision",
            Category::Aria => "aria",
            Category::Keyboard => "keyboard",
            Category::Images => "images",
            Category::FocusStyle => "focus_style",
            Category::TouchTargets => "touch_targets",
            Category::FocusOrder => "focus_order",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
