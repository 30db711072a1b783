//! Stable, content-derived finding IDs.
//!
//! The ID is a 32-bit djb2 hash over the normalized
//! `(url, category, type, selector, text)` tuple, so a finding keeps its ID
//! across runs as long as those fields do not change beyond case and
//! whitespace. Collisions are possible and not detected.

use crate::core::Finding;

const SEPARATOR: &str = "|";
const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{2060}'];

/// Lowercase, strip zero-width characters, collapse whitespace.
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !ZERO_WIDTH.contains(c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn djb2(input: &str) -> u32 {
    input.chars().fold(5381u32, |hash, c| {
        hash.wrapping_mul(33).wrapping_add(c as u32)
    })
}

pub fn issue_id(url: &str, category: &str, finding_type: &str, selector: &str, text: &str) -> String {
    let key = [url, category, finding_type, selector, text]
        .iter()
        .map(|part| normalize(part))
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    format!("{:08x}", djb2(&key))
}

/// Fills `finding.id` from its current content. `url` must already be set.
pub fn assign(finding: &mut Finding) {
    let id = issue_id(
        &finding.url,
        finding.category.as_str(),
        &finding.finding_type,
        finding.selector(),
        finding.text(),
    );
    finding.id = Some(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Category, FindingContext, Severity};

    fn finding(text: &str) -> Finding {
        let mut f = Finding::new(
            Category::Images,
            "missing_alt_text",
            Severity::Critical,
            "Image has no alt attribute",
            "Add alt text.",
            FindingContext::new("main img.hero").with_text(text),
        );
        f.url = "https://example.com/".to_string();
        f
    }

    #[test]
    fn ids_are_eight_hex_chars() {
        let id = issue_id("a", "b", "c", "d", "e");
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn djb2_matches_reference_values() {
        assert_eq!(djb2(""), 5381);
        assert_eq!(djb2("a"), 5381 * 33 + 97);
    }

    #[test]
    fn same_content_yields_same_id() {
        let mut a = finding("hero.jpg");
        let mut b = finding("hero.jpg");
        assign(&mut b);
        assign(&mut a);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn case_whitespace_and_zero_width_are_ignored() {
        let mut a = finding("Hero  image");
        let mut b = finding("hero\u{200B} image");
        assign(&mut a);
        assign(&mut b);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn changing_text_changes_id() {
        let mut a = finding("hero.jpg");
        let mut b = finding("banner.jpg");
        assign(&mut a);
        assign(&mut b);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn message_is_used_when_no_text_sample() {
        let mut a = finding("");
        assign(&mut a);
        let expected = issue_id(
            "https://example.com/",
            "images",
            "missing_alt_text",
            "main img.hero",
            "Image has no alt attribute",
        );
        assert_eq!(a.id.as_deref(), Some(expected.as_str()));
    }
}
