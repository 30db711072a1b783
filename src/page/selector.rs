use anyhow::Result;

use super::{MAX_ANCESTOR_DEPTH, NodeId, PageSnapshot, class_list};

/// Builds a CSS selector for `node` that is as short as possible while
/// matching exactly one element of the page.
///
/// Order of preference:
/// 1. `#id` when the id is a plain identifier used exactly once;
/// 2. tag plus up to two classes, scoped under the nearest landmark when
///    there is one, with `:nth-of-type` added only if that is not unique;
/// 3. a `>` chain of `tag:nth-of-type(n)` steps up through the ancestors,
///    stopping at the first prefix that is unique. A bare tag name is never
///    returned.
pub fn selector_for(page: &dyn PageSnapshot, node: NodeId) -> Result<String> {
    if let Some(id) = page.attribute(node, "id")? {
        if is_css_ident(&id) && count_with_id(page, &id)? == 1 {
            return Ok(format!("#{id}"));
        }
    }

    let classes: Vec<String> = class_list(page, node)?
        .into_iter()
        .filter(|c| is_css_ident(c))
        .take(2)
        .collect();
    let leaf = Compound {
        tag: Some(page.tag_name(node)?),
        classes,
        ..Compound::default()
    };
    let positioned = Compound {
        nth: Some(nth_of_type(page, node)?),
        ..leaf.clone()
    };

    let landmark = nearest_landmark(page, node)?;
    let scope = match landmark {
        Some(n) => Some(landmark_compound(page, n)?),
        None => None,
    };

    if !leaf.classes.is_empty() || scope.is_some() {
        for compound in [&leaf, &positioned] {
            let mut candidate = Selector::default();
            if let Some(scope) = &scope {
                candidate.push(Combinator::Descendant, scope.clone());
            }
            candidate.push(Combinator::Descendant, compound.clone());
            if candidate.is_unique(page)? {
                return Ok(candidate.render());
            }
        }
    }

    // Walk up one ancestor at a time. Each step pins the position among
    // siblings, so the chain only grows until it is unambiguous.
    let mut chain = vec![positioned];
    let mut current = node;
    let mut inside_scope = scope.is_some();
    let mut fallback = None;
    for _ in 0..MAX_ANCESTOR_DEPTH {
        let Some(parent) = page.parent(current)? else {
            break;
        };
        if Some(parent) == landmark {
            inside_scope = false;
        }
        let step = ancestor_compound(page, parent)?;
        let anchored = step.id.is_some();
        chain.insert(0, step);

        let mut candidate = Selector::default();
        if let (Some(scope), true) = (&scope, inside_scope) {
            candidate.push(Combinator::Descendant, scope.clone());
        }
        for (i, compound) in chain.iter().enumerate() {
            let combinator = if i == 0 {
                Combinator::Descendant
            } else {
                Combinator::Child
            };
            candidate.push(combinator, compound.clone());
        }
        if anchored || candidate.is_unique(page)? {
            return Ok(candidate.render());
        }
        fallback = Some(candidate);
        current = parent;
    }

    Ok(match fallback {
        Some(candidate) => candidate.render(),
        None => chain
            .iter()
            .map(Compound::render)
            .collect::<Vec<_>>()
            .join(" > "),
    })
}

/// The landmark role an element exposes, if any.
pub fn landmark_role(page: &dyn PageSnapshot, node: NodeId) -> Result<Option<&'static str>> {
    if let Some(role) = page.attribute(node, "role")? {
        let role = role.trim().to_ascii_lowercase();
        let known = match role.as_str() {
            "main" => Some("main"),
            "navigation" => Some("navigation"),
            "banner" => Some("banner"),
            "contentinfo" => Some("contentinfo"),
            "complementary" => Some("complementary"),
            "search" => Some("search"),
            "region" => Some("region"),
            _ => None,
        };
        if known.is_some() {
            return Ok(known);
        }
    }
    Ok(match page.tag_name(node)?.as_str() {
        "main" => Some("main"),
        "nav" => Some("navigation"),
        "header" => Some("banner"),
        "footer" => Some("contentinfo"),
        "aside" => Some("complementary"),
        "search" => Some("search"),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One compound selector: `tag#id.class[role="x"]:nth-of-type(n)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    role: Option<String>,
    nth: Option<usize>,
}

impl Compound {
    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(tag) = &self.tag {
            out.push_str(tag);
        }
        if let Some(id) = &self.id {
            out.push('#');
            out.push_str(id);
        }
        for class in &self.classes {
            out.push('.');
            out.push_str(class);
        }
        if let Some(role) = &self.role {
            out.push_str(&format!("[role=\"{role}\"]"));
        }
        if let Some(nth) = self.nth {
            out.push_str(&format!(":nth-of-type({nth})"));
        }
        if out.is_empty() {
            out.push('*');
        }
        out
    }

    fn matches(&self, page: &dyn PageSnapshot, node: NodeId) -> Result<bool> {
        if let Some(tag) = &self.tag {
            if page.tag_name(node)? != *tag {
                return Ok(false);
            }
        }
        if let Some(id) = &self.id {
            if page.attribute(node, "id")?.as_deref() != Some(id.as_str()) {
                return Ok(false);
            }
        }
        if !self.classes.is_empty() {
            let own = class_list(page, node)?;
            if !self.classes.iter().all(|c| own.contains(c)) {
                return Ok(false);
            }
        }
        if let Some(role) = &self.role {
            let own = page.attribute(node, "role")?;
            if own.as_deref().map(str::trim) != Some(role.as_str()) {
                return Ok(false);
            }
        }
        if let Some(nth) = self.nth {
            if nth_of_type(page, node)? != nth {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// The subset of CSS this module emits, evaluated against the page so a
/// candidate is only accepted once it matches a single element.
#[derive(Debug, Clone, Default)]
struct Selector {
    parts: Vec<(Combinator, Compound)>,
}

impl Selector {
    fn push(&mut self, combinator: Combinator, compound: Compound) {
        self.parts.push((combinator, compound));
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (i, (combinator, compound)) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push_str(match combinator {
                    Combinator::Descendant => " ",
                    Combinator::Child => " > ",
                });
            }
            out.push_str(&compound.render());
        }
        out
    }

    fn is_unique(&self, page: &dyn PageSnapshot) -> Result<bool> {
        let mut count = 0;
        for node in page.elements() {
            if matches_parts(page, &self.parts, node)? {
                count += 1;
                if count > 1 {
                    return Ok(false);
                }
            }
        }
        Ok(count == 1)
    }
}

fn matches_parts(
    page: &dyn PageSnapshot,
    parts: &[(Combinator, Compound)],
    node: NodeId,
) -> Result<bool> {
    let Some(((combinator, compound), rest)) = parts.split_last() else {
        return Ok(true);
    };
    if !compound.matches(page, node)? {
        return Ok(false);
    }
    if rest.is_empty() {
        return Ok(true);
    }
    match combinator {
        Combinator::Child => match page.parent(node)? {
            Some(parent) => matches_parts(page, rest, parent),
            None => Ok(false),
        },
        Combinator::Descendant => {
            let mut current = page.parent(node)?;
            let mut depth = 0;
            while let Some(n) = current {
                if depth >= MAX_ANCESTOR_DEPTH {
                    break;
                }
                if matches_parts(page, rest, n)? {
                    return Ok(true);
                }
                current = page.parent(n)?;
                depth += 1;
            }
            Ok(false)
        }
    }
}

fn nearest_landmark(page: &dyn PageSnapshot, node: NodeId) -> Result<Option<NodeId>> {
    let mut current = page.parent(node)?;
    let mut depth = 0;
    while let Some(n) = current {
        if depth >= MAX_ANCESTOR_DEPTH {
            break;
        }
        if landmark_role(page, n)?.is_some() {
            return Ok(Some(n));
        }
        current = page.parent(n)?;
        depth += 1;
    }
    Ok(None)
}

fn unique_id(page: &dyn PageSnapshot, node: NodeId) -> Result<Option<String>> {
    match page.attribute(node, "id")? {
        Some(id) if is_css_ident(&id) && count_with_id(page, &id)? == 1 => Ok(Some(id)),
        _ => Ok(None),
    }
}

fn landmark_compound(page: &dyn PageSnapshot, node: NodeId) -> Result<Compound> {
    if let Some(id) = unique_id(page, node)? {
        return Ok(Compound {
            id: Some(id),
            ..Compound::default()
        });
    }
    let tag = page.tag_name(node)?;
    if matches!(tag.as_str(), "main" | "nav" | "header" | "footer" | "aside" | "search") {
        return Ok(Compound {
            tag: Some(tag),
            ..Compound::default()
        });
    }
    let role = page.attribute(node, "role")?.map(|r| r.trim().to_string());
    Ok(Compound {
        tag: Some(tag),
        role,
        ..Compound::default()
    })
}

fn ancestor_compound(page: &dyn PageSnapshot, node: NodeId) -> Result<Compound> {
    if let Some(id) = unique_id(page, node)? {
        return Ok(Compound {
            id: Some(id),
            ..Compound::default()
        });
    }
    let tag = page.tag_name(node)?;
    let nth = match (tag.as_str(), page.parent(node)?) {
        ("html" | "body", _) | (_, None) => None,
        _ => Some(nth_of_type(page, node)?),
    };
    Ok(Compound {
        tag: Some(tag),
        nth,
        ..Compound::default()
    })
}

fn count_with_id(page: &dyn PageSnapshot, id: &str) -> Result<usize> {
    let mut count = 0;
    for node in page.elements() {
        if page.attribute(node, "id")?.as_deref() == Some(id) {
            count += 1;
        }
    }
    Ok(count)
}

/// 1-based position among siblings sharing the same tag.
fn nth_of_type(page: &dyn PageSnapshot, node: NodeId) -> Result<usize> {
    let Some(parent) = page.parent(node)? else {
        return Ok(1);
    };
    let tag = page.tag_name(node)?;
    let mut n = 0;
    for sibling in page.children(parent)? {
        if page.tag_name(sibling)? == tag {
            n += 1;
        }
        if sibling == node {
            break;
        }
    }
    Ok(n.max(1))
}

fn is_css_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '-') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::StaticPage;
    use serde_json::json;

    fn page(doc: serde_json::Value) -> StaticPage {
        StaticPage::from_json(&json!({"url": "https://example.com/", "document": doc}).to_string())
            .expect("snapshot")
    }

    fn find(page: &StaticPage, tag: &str, index: usize) -> NodeId {
        page.elements()
            .into_iter()
            .filter(|n| page.tag_name(*n).expect("tag") == tag)
            .nth(index)
            .expect("node")
    }

    #[test]
    fn prefers_unique_id() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "button", "attributes": {"id": "save", "class": "btn"}}
        ]}));
        assert_eq!(selector_for(&p, find(&p, "button", 0)).expect("selector"), "#save");
    }

    #[test]
    fn duplicate_id_falls_through_to_classes() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "button", "attributes": {"id": "dup", "class": "btn primary large"}},
            {"tag": "span", "attributes": {"id": "dup"}}
        ]}));
        assert_eq!(
            selector_for(&p, find(&p, "button", 0)).expect("selector"),
            "button.btn.primary"
        );
    }

    #[test]
    fn scopes_under_landmark_and_adds_nth_only_when_needed() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "nav", "children": [
                {"tag": "a", "attributes": {"class": "item"}},
                {"tag": "a", "attributes": {"class": "item"}}
            ]},
            {"tag": "main", "children": [
                {"tag": "h1"}
            ]}
        ]}));
        assert_eq!(selector_for(&p, find(&p, "a", 1)).expect("selector"), "nav a.item:nth-of-type(2)");
        assert_eq!(selector_for(&p, find(&p, "h1", 0)).expect("selector"), "main h1");
    }

    #[test]
    fn never_returns_bare_tag() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "div"}, {"tag": "p"}, {"tag": "p"}
        ]}));
        assert_eq!(selector_for(&p, find(&p, "p", 1)).expect("selector"), "body > p:nth-of-type(2)");
        assert_eq!(selector_for(&p, find(&p, "div", 0)).expect("selector"), "body > div:nth-of-type(1)");
    }

    #[test]
    fn nested_list_links_get_distinct_selectors() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "nav", "children": [
                {"tag": "ul", "children": [
                    {"tag": "li", "children": [{"tag": "a", "attributes": {"class": "icon", "href": "/a"}}]},
                    {"tag": "li", "children": [{"tag": "a", "attributes": {"class": "icon", "href": "/b"}}]}
                ]}
            ]}
        ]}));
        let first = selector_for(&p, find(&p, "a", 0)).expect("selector");
        let second = selector_for(&p, find(&p, "a", 1)).expect("selector");
        assert_eq!(first, "nav li:nth-of-type(1) > a.icon:nth-of-type(1)");
        assert_eq!(second, "nav li:nth-of-type(2) > a.icon:nth-of-type(1)");
    }

    #[test]
    fn chain_stops_at_ancestor_with_unique_id() {
        let block = |id: Option<&str>| {
            let attributes = match id {
                Some(id) => json!({"id": id}),
                None => json!({}),
            };
            json!({"tag": "div", "attributes": attributes, "children": [
                {"tag": "div", "children": [{"tag": "span"}]},
                {"tag": "div", "children": [{"tag": "span"}]}
            ]})
        };
        let p = page(json!({"tag": "body", "children": [block(Some("cards")), block(None)]}));
        assert_eq!(
            selector_for(&p, find(&p, "span", 1)).expect("selector"),
            "#cards > div:nth-of-type(2) > span:nth-of-type(1)"
        );
        assert_eq!(
            selector_for(&p, find(&p, "span", 3)).expect("selector"),
            "div:nth-of-type(2) > div:nth-of-type(2) > span:nth-of-type(1)"
        );
    }

    #[test]
    fn every_generated_selector_matches_one_element() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "nav", "children": [{"tag": "a", "attributes": {"class": "x"}}]},
            {"tag": "nav", "children": [{"tag": "a", "attributes": {"class": "x"}}]},
            {"tag": "main", "children": [
                {"tag": "section", "children": [{"tag": "p"}, {"tag": "p"}]},
                {"tag": "section", "children": [{"tag": "p"}, {"tag": "p"}]}
            ]}
        ]}));
        let mut seen = std::collections::BTreeSet::new();
        for node in p.elements() {
            let s = selector_for(&p, node).expect("selector");
            assert!(seen.insert(s.clone()), "duplicate selector {s}");
        }
    }

    #[test]
    fn landmark_roles_from_tags_and_roles() {
        let p = page(json!({"tag": "body", "children": [
            {"tag": "div", "attributes": {"role": "navigation"}},
            {"tag": "footer"}
        ]}));
        assert_eq!(landmark_role(&p, find(&p, "div", 0)).expect("role"), Some("navigation"));
        assert_eq!(landmark_role(&p, find(&p, "footer", 0)).expect("role"), Some("contentinfo"));
        assert_eq!(landmark_role(&p, find(&p, "body", 0)).expect("role"), None);
    }
}
