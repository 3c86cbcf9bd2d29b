//! HTML-to-text extraction for forum posts and arbitrary source pages.
//!
//! Intentionally "good enough" and deterministic, not a readability
//! engine: pick a content region, drop unwanted subtrees, collect text.
//! Malformed markup degrades to whatever text is parseable; it never
//! fails.

use ego_tree::NodeId;
use html_scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Rules for one extraction pass.
///
/// `collapse_whitespace` is the policy split between the two call sites:
/// forum posts keep their newlines (the annotator needs paragraph
/// structure), source pages collapse to single spaces.
#[derive(Debug, Clone)]
pub struct ExtractRules<'a> {
    /// Content region; falls back to the document body when unset or
    /// unmatched.
    pub content_selector: Option<&'a str>,
    /// Subtrees to drop before collecting text.
    pub remove_selectors: &'a [&'a str],
    pub collapse_whitespace: bool,
}

fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn removed_node_ids(doc: &Html, remove_selectors: &[&str]) -> HashSet<NodeId> {
    let mut removed = HashSet::new();
    for sel in remove_selectors {
        let Ok(sel) = Selector::parse(sel) else {
            continue;
        };
        for el in doc.select(&sel) {
            removed.insert(el.id());
        }
    }
    removed
}

fn collect_text(root: ElementRef<'_>, removed: &HashSet<NodeId>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        if let Some(text) = node.value().as_text() {
            if node.ancestors().any(|a| removed.contains(&a.id())) {
                continue;
            }
            out.push_str(text);
        }
    }
    out
}

fn body_root(doc: &Html) -> ElementRef<'_> {
    if let Ok(body) = Selector::parse("body") {
        if let Some(el) = doc.select(&body).next() {
            return el;
        }
    }
    doc.root_element()
}

/// Plain text of the content region of `html` under `rules`.
///
/// A content selector that matches nothing yields an empty string (the
/// caller decides whether that is fatal); the body fallback applies only
/// when no selector is given. Pure; performs no IO.
pub fn extract_text(html: &str, rules: &ExtractRules<'_>) -> String {
    let doc = Html::parse_document(html);
    let removed = removed_node_ids(&doc, rules.remove_selectors);
    let root = match rules.content_selector {
        Some(sel) => {
            let Some(el) = Selector::parse(sel)
                .ok()
                .and_then(|s| doc.select(&s).next())
            else {
                return String::new();
            };
            el
        }
        None => body_root(&doc),
    };
    let raw = collect_text(root, &removed);
    if rules.collapse_whitespace {
        norm_ws(&raw)
    } else {
        raw.trim().to_string()
    }
}

/// Single-parse prioritized cascade: the first selector matching at least
/// one element wins; otherwise the document body. Used for third-party
/// pages with no uniform structure; the universal fallback guarantees a
/// (possibly empty) result.
pub fn extract_text_cascade(
    html: &str,
    selectors: &[&str],
    remove_selectors: &[&str],
    collapse_whitespace: bool,
) -> String {
    let doc = Html::parse_document(html);
    let removed = removed_node_ids(&doc, remove_selectors);

    let mut root = None;
    for sel in selectors {
        let Ok(sel) = Selector::parse(sel) else {
            continue;
        };
        if let Some(el) = doc.select(&sel).next() {
            root = Some(el);
            break;
        }
    }
    let root = root.unwrap_or_else(|| body_root(&doc));

    let raw = collect_text(root, &removed);
    if collapse_whitespace {
        norm_ws(&raw)
    } else {
        raw.trim().to_string()
    }
}
