//! The per-page check passes.
//!
//! Every pass reads the same snapshot and returns its own findings plus any
//! supplementary data; none of them mutates shared state. The engine merges
//! the outputs.

pub mod aria;
pub mod contrast;
pub mod focus_order;
pub mod focus_style;
pub mod images;
pub mod keyboard;
pub mod structure;
pub mod touch_targets;
pub mod vision;

pub use contrast::{ColorPair, ContrastCheck, ContrastData};
pub use focus_order::TabStop;
pub use structure::{HeadingEntry, StructureData};

use crate::core::Finding;

/// Upper bound on elements any single pass inspects.
pub const MAX_ELEMENTS: usize = 20_000;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutput<T> {
    pub findings: Vec<Finding>,
    pub data: T,
}

impl<T: Default> CheckOutput<T> {
    pub fn empty() -> Self {
        Self {
            findings: Vec::new(),
            data: T::default(),
        }
    }
}

impl<T> CheckOutput<T> {
    pub fn new(findings: Vec<Finding>, data: T) -> Self {
        Self { findings, data }
    }
}

/// Selector used for findings about the page as a whole.
pub(crate) const PAGE_SELECTOR: &str = "body";

#[cfg(test)]
pub(crate) mod testing {
    use crate::page::{NodeId, PageSnapshot, StaticPage};
    use serde_json::{Value, json};

    pub fn page(doc: Value) -> StaticPage {
        StaticPage::from_json(&json!({"url": "https://example.com/", "document": doc}).to_string())
            .expect("snapshot")
    }

    pub fn bbox(x: f64, y: f64, width: f64, height: f64) -> Value {
        json!({"x": x, "y": y, "width": width, "height": height})
    }

    pub fn nodes_with_tag(page: &StaticPage, tag: &str) -> Vec<NodeId> {
        page.elements()
            .into_iter()
            .filter(|n| page.tag_name(*n).expect("tag") == tag)
            .collect()
    }

    pub fn types(findings: &[crate::core::Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.finding_type.as_str()).collect()
    }
}
