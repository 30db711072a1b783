//! Read-only view of one loaded page.
//!
//! Check passes receive a `&dyn PageSnapshot` and never reach for ambient DOM
//! state, so they run the same against a captured document or a live driver.

mod document;
mod selector;

pub use document::{NodeSpec, StaticPage};
pub use selector::{landmark_role, selector_for};

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Upper bound for any ancestor walk.
pub const MAX_ANCESTOR_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    None,
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Edge-to-edge distance; zero when the rectangles touch or overlap.
    pub fn gap_to(&self, other: &Rect) -> f64 {
        let dx = (other.x - self.right()).max(self.x - other.right()).max(0.0);
        let dy = (other.y - self.bottom()).max(self.y - other.bottom()).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Computed style values keyed by CSS property name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComputedStyle(BTreeMap<String, String>);

impl ComputedStyle {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, property: &str, default: &'a str) -> &'a str {
        self.get(property).unwrap_or(default)
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.0.insert(property.into(), value.into());
    }

    /// `background-image` when it names an actual image or gradient.
    pub fn background_image(&self) -> Option<&str> {
        self.get("background-image").filter(|v| *v != "none")
    }

    pub fn font_size_px(&self) -> f64 {
        parse_px(self.get_or("font-size", "16px")).unwrap_or(16.0)
    }

    pub fn font_weight(&self) -> u16 {
        match self.get_or("font-weight", "400") {
            "normal" => 400,
            "bold" | "bolder" => 700,
            "lighter" => 300,
            other => other.parse::<f64>().map(|w| w.round() as u16).unwrap_or(400),
        }
    }
}

/// `"16px"` -> 16.0. Unitless numbers are accepted as pixels.
pub fn parse_px(value: &str) -> Option<f64> {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v).trim();
    v.parse::<f64>().ok().filter(|n| n.is_finite())
}

const INTERACTIVE_ROLES: [&str; 14] = [
    "button",
    "link",
    "checkbox",
    "radio",
    "switch",
    "tab",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "combobox",
    "slider",
    "spinbutton",
    "textbox",
];

/// The page capability consumed by every check pass.
///
/// Reads may fail (a detached node, a driver error); callers propagate the
/// error and the engine isolates it to the pass that hit it.
pub trait PageSnapshot {
    fn url(&self) -> &str;

    /// All element nodes in document order.
    fn elements(&self) -> Vec<NodeId>;

    /// Lowercase tag name.
    fn tag_name(&self, node: NodeId) -> Result<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>>;

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>>;

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>>;

    /// Text of the element's own text nodes, excluding descendants.
    fn direct_text(&self, node: NodeId) -> Result<String>;

    fn text_content(&self, node: NodeId) -> Result<String>;

    fn computed_style(&self, node: NodeId, pseudo: Pseudo) -> Result<ComputedStyle>;

    /// Style with `:focus` applied, when the provider can produce it.
    fn focus_style(&self, node: NodeId) -> Result<Option<ComputedStyle>>;

    fn bounding_box(&self, node: NodeId) -> Result<Option<Rect>>;

    fn has_attribute(&self, node: NodeId, name: &str) -> Result<bool> {
        Ok(self.attribute(node, name)?.is_some())
    }

    fn element_by_id(&self, id: &str) -> Result<Option<NodeId>> {
        for node in self.elements() {
            if self.attribute(node, "id")?.as_deref() == Some(id) {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    fn is_visible(&self, node: NodeId) -> Result<bool> {
        let style = self.computed_style(node, Pseudo::None)?;
        if style.get("display") == Some("none") || style.get("visibility") == Some("hidden") {
            return Ok(false);
        }
        if style.get("opacity").and_then(|o| o.parse::<f64>().ok()) == Some(0.0) {
            return Ok(false);
        }
        Ok(self.bounding_box(node)?.is_some_and(|b| !b.is_empty()))
    }

    /// Exposed to assistive technology: neither the element nor an ancestor
    /// is `display: none`, and the element is not `visibility: hidden`.
    fn is_rendered(&self, node: NodeId) -> Result<bool> {
        let style = self.computed_style(node, Pseudo::None)?;
        if style.get("visibility") == Some("hidden") {
            return Ok(false);
        }
        let mut current = Some(node);
        let mut depth = 0;
        while let Some(n) = current {
            if depth >= MAX_ANCESTOR_DEPTH {
                break;
            }
            if self.computed_style(n, Pseudo::None)?.get("display") == Some("none") {
                return Ok(false);
            }
            current = self.parent(n)?;
            depth += 1;
        }
        Ok(true)
    }

    /// Matches `a[href]`, form controls, `summary`, interactive roles and
    /// non-negative `tabindex`.
    fn is_interactive(&self, node: NodeId) -> Result<bool> {
        let tag = self.tag_name(node)?;
        let native = match tag.as_str() {
            "a" | "area" => self.has_attribute(node, "href")?,
            "button" | "select" | "textarea" | "summary" => true,
            "input" => self.attribute(node, "type")?.as_deref() != Some("hidden"),
            _ => false,
        };
        if native {
            return Ok(true);
        }
        if let Some(role) = self.attribute(node, "role")? {
            if role
                .split_whitespace()
                .any(|r| INTERACTIVE_ROLES.contains(&r.to_ascii_lowercase().as_str()))
            {
                return Ok(true);
            }
        }
        Ok(tabindex(self, node)?.is_some_and(|t| t >= 0))
    }

    /// Reachable with the Tab key: natively focusable and enabled, or given
    /// a `tabindex` of zero or more.
    fn is_focusable(&self, node: NodeId) -> Result<bool> {
        let tab = tabindex(self, node)?;
        if tab.is_some_and(|t| t < 0) {
            return Ok(false);
        }
        if tab.is_some() {
            return Ok(true);
        }
        let tag = self.tag_name(node)?;
        let disabled = self.has_attribute(node, "disabled")?;
        let native = match tag.as_str() {
            "a" | "area" => self.has_attribute(node, "href")?,
            "button" | "select" | "textarea" => !disabled,
            "input" => !disabled && self.attribute(node, "type")?.as_deref() != Some("hidden"),
            "summary" | "iframe" => true,
            _ => false,
        };
        if native {
            return Ok(true);
        }
        Ok(self
            .attribute(node, "contenteditable")?
            .is_some_and(|v| v != "false"))
    }

    fn interactive_elements(&self) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        for node in self.elements() {
            if self.is_interactive(node)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    fn focusable_elements(&self) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        for node in self.elements() {
            if self.is_focusable(node)? {
                out.push(node);
            }
        }
        Ok(out)
    }
}

/// Parsed `tabindex`, ignoring values that are not integers.
pub fn tabindex<P: PageSnapshot + ?Sized>(page: &P, node: NodeId) -> Result<Option<i32>> {
    Ok(page
        .attribute(node, "tabindex")?
        .and_then(|v| v.trim().parse::<i32>().ok()))
}

/// Nearest ancestors first, starting at `node` itself.
pub fn ancestors_inclusive(page: &dyn PageSnapshot, node: NodeId) -> Result<Vec<NodeId>> {
    let mut out = vec![node];
    let mut current = node;
    while out.len() < MAX_ANCESTOR_DEPTH {
        match page.parent(current)? {
            Some(parent) => {
                out.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    Ok(out)
}

pub fn class_list(page: &dyn PageSnapshot, node: NodeId) -> Result<Vec<String>> {
    Ok(page
        .attribute(node, "class")?
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default())
}
