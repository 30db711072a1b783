use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::{ComputedStyle, NodeId, PageSnapshot, Pseudo, Rect};

/// One element of a captured snapshot document, as written by the capture
/// tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_style: Option<ComputedStyle>,
    #[serde(default)]
    pub before: ComputedStyle,
    #[serde(default)]
    pub after: ComputedStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Rect>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    url: String,
    document: NodeSpec,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    style: ComputedStyle,
    focus_style: Option<ComputedStyle>,
    before: ComputedStyle,
    after: ComputedStyle,
    bbox: Option<Rect>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A snapshot held entirely in memory; node ids follow document order.
#[derive(Debug, Clone)]
pub struct StaticPage {
    url: String,
    nodes: Vec<Node>,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, root: NodeSpec) -> Self {
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<(NodeSpec, Option<NodeId>)> = vec![(root, None)];

        while let Some((mut spec, parent)) = stack.pop() {
            let id = NodeId(nodes.len());
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }
            let children = std::mem::take(&mut spec.children);
            nodes.push(Node {
                tag: spec.tag.to_ascii_lowercase(),
                attributes: spec.attributes,
                style: spec.style,
                focus_style: spec.focus_style,
                before: spec.before,
                after: spec.after,
                bbox: spec.bbox,
                text: spec.text,
                parent,
                children: Vec::new(),
            });
            for child in children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        Self {
            url: url.into(),
            nodes,
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let doc: SnapshotDocument =
            serde_json::from_str(s).context("failed to parse snapshot document (JSON)")?;
        Ok(Self::new(doc.url, doc.document))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
        Self::from_json(&s).with_context(|| format!("invalid snapshot: {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| anyhow!("unknown node {}", id.0))
    }
}

impl PageSnapshot for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn elements(&self) -> Vec<NodeId> {
        (0..self.nodes.len()).map(NodeId).collect()
    }

    fn tag_name(&self, node: NodeId) -> Result<String> {
        Ok(self.node(node)?.tag.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.node(node)?.attributes.get(name).cloned())
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(node)?.parent)
    }

    fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(node)?.children.clone())
    }

    fn direct_text(&self, node: NodeId) -> Result<String> {
        Ok(self.node(node)?.text.clone())
    }

    fn text_content(&self, node: NodeId) -> Result<String> {
        let mut parts = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let n = self.node(id)?;
            if !n.text.trim().is_empty() {
                parts.push(n.text.trim().to_string());
            }
            stack.extend(n.children.iter().rev().copied());
        }
        Ok(parts.join(" "))
    }

    fn computed_style(&self, node: NodeId, pseudo: Pseudo) -> Result<ComputedStyle> {
        let n = self.node(node)?;
        Ok(match pseudo {
            Pseudo::None => n.style.clone(),
            Pseudo::Before => n.before.clone(),
            Pseudo::After => n.after.clone(),
        })
    }

    fn focus_style(&self, node: NodeId) -> Result<Option<ComputedStyle>> {
        Ok(self.node(node)?.focus_style.clone())
    }

    fn bounding_box(&self, node: NodeId) -> Result<Option<Rect>> {
        Ok(self.node(node)?.bbox)
    }
}
