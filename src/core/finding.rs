use crate::core::{Category, Severity};
use serde::{Deserialize, Serialize};

/// One accessibility issue produced by a check pass.
///
/// `id`, `url` and `ignored` are filled in by the engine after all passes ran;
/// everything else is fixed when the pass creates the finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub url: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub finding_type: String,
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wcag: Option<String>,
    pub context: FindingContext,
    #[serde(default)]
    pub ignored: bool,
}

impl Finding {
    pub fn new(
        category: Category,
        finding_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        recommendation: impl Into<String>,
        context: FindingContext,
    ) -> Self {
        Self {
            id: None,
            url: String::new(),
            category,
            finding_type: finding_type.into(),
            severity,
            message: message.into(),
            recommendation: recommendation.into(),
            wcag: None,
            context,
            ignored: false,
        }
    }

    pub fn with_wcag(mut self, criterion: &str) -> Self {
        self.wcag = Some(criterion.to_string());
        self
    }

    pub fn selector(&self) -> &str {
        &self.context.selector
    }

    /// The text sample when one was captured, otherwise the message.
    pub fn text(&self) -> &str {
        match self.context.text_sample.as_deref() {
            Some(sample) if !sample.trim().is_empty() => sample,
            _ => &self.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingContext {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_sample: Option<String>,
    #[serde(flatten)]
    pub detail: ContextDetail,
}

impl FindingContext {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text_sample: None,
            detail: ContextDetail::General,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        let sample = text_sample(text);
        if !sample.is_empty() {
            self.text_sample = Some(sample);
        }
        self
    }

    pub fn with_detail(mut self, detail: ContextDetail) -> Self {
        self.detail = detail;
        self
    }
}

/// Category-specific payload carried next to the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextDetail {
    General,
    Heading {
        from_level: u8,
        to_level: u8,
    },
    Contrast {
        foreground: String,
        background: String,
        ratio: f64,
        required_ratio: f64,
        font_size: f64,
        font_weight: u16,
        large_text: bool,
        level: String,
    },
    ContrastReview {
        foreground: String,
        background_image: String,
    },
    Vision {
        foreground: String,
        background: String,
        failing_types: Vec<String>,
        max_impact: i64,
    },
    Aria {
        attribute: String,
        value: String,
    },
    TouchTarget {
        width: f64,
        height: f64,
        level: String,
    },
    TouchSpacing {
        other_selector: String,
        gap: f64,
    },
    FocusOrder {
        position: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tabindex: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_selector: Option<String>,
    },
}

const TEXT_SAMPLE_MAX_CHARS: usize = 80;

/// Collapses whitespace and truncates to a short sample for reports.
pub fn text_sample(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= TEXT_SAMPLE_MAX_CHARS {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(TEXT_SAMPLE_MAX_CHARS).collect();
    out.push('…');
    out
}
