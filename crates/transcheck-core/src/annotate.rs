//! Span annotator: anchors discrepancy records onto the post text as
//! paragraph-segmented highlight runs.
//!
//! The mapping is recomputed on every render pass from
//! `(post_text, discrepancies)` and never cached; offsets are only valid
//! against the exact text they were computed from.
//!
//! Design notes:
//! - Offsets are UTF-8 byte offsets and always land on char boundaries
//!   (every match is an occurrence of a valid UTF-8 needle).
//! - Matching is offset-based with a single merge-walk per paragraph, not
//!   sequential split/replace: once two flagged substrings overlap, or one
//!   is a substring of another's already-replaced region, naive splitting
//!   corrupts offsets. First-found-wins on overlap keeps the output
//!   deterministic and non-overlapping.

use crate::model::DiscrepancyRecord;
use serde::Serialize;

/// Number of distinct highlight color groups. Record `i` always renders
/// in group `i % PALETTE_SIZE`, so repeated renders are visually stable.
pub const PALETTE_SIZE: usize = 7;

/// A contiguous run of paragraph text, either plain or highlighted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Plain {
        text: String,
    },
    Highlight {
        text: String,
        /// Index of the source record in the input discrepancy sequence.
        record: usize,
        /// Stable highlight-group identity (`record % PALETTE_SIZE`).
        color_group: usize,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain { text } => text,
            Segment::Highlight { text, .. } => text,
        }
    }
}

/// One non-blank paragraph of the post, split into ordered segments.
///
/// `start..end` is the paragraph's byte range in the original post text;
/// concatenating the segment texts reproduces exactly that slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedParagraph {
    pub start: usize,
    pub end: usize,
    pub segments: Vec<Segment>,
}

struct Match {
    start: usize,
    end: usize,
    record: usize,
}

/// Byte ranges of the non-blank paragraphs of `text`.
///
/// A paragraph is a maximal run of lines that are not whitespace-only;
/// the blank-line runs between them are the separators. Ranges never
/// include a trailing newline, so the text between and around paragraphs
/// is whitespace-only.
pub fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut cur: Option<(usize, usize)> = None;

    let mut line_start = 0usize;
    let bytes = text.as_bytes();
    let mut i = 0usize;
    loop {
        let at_end = i == bytes.len();
        if at_end || bytes[i] == b'\n' {
            let line = &text[line_start..i];
            if !line.trim().is_empty() {
                cur = match cur {
                    Some((s, _)) => Some((s, i)),
                    None => Some((line_start, i)),
                };
            } else if let Some(span) = cur.take() {
                spans.push(span);
            }
            if at_end {
                break;
            }
            line_start = i + 1;
        }
        i += 1;
    }
    if let Some(span) = cur {
        spans.push(span);
    }
    spans
}

/// Every non-overlapping left-to-right occurrence of `needle` in `hay`.
fn occurrences(hay: &str, needle: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    if needle.is_empty() {
        return out;
    }
    let mut at = 0usize;
    while let Some(p) = hay[at..].find(needle) {
        let start = at + p;
        let end = start + needle.len();
        out.push((start, end));
        at = end;
    }
    out
}

/// Map `discrepancies` onto `post_text` as render-ready paragraphs.
///
/// Pure and deterministic: identical inputs always yield identical output
/// sequences. A record whose `problematic_text` occurs nowhere contributes
/// zero segments; partial annotation beats failing the whole render.
pub fn annotate(post_text: &str, discrepancies: &[DiscrepancyRecord]) -> Vec<AnnotatedParagraph> {
    let mut out = Vec::new();

    for (p_start, p_end) in paragraph_spans(post_text) {
        let para = &post_text[p_start..p_end];
        if para.trim().is_empty() {
            continue;
        }

        let mut matches: Vec<Match> = Vec::new();
        for (idx, rec) in discrepancies.iter().enumerate() {
            for (start, end) in occurrences(para, &rec.problematic_text) {
                matches.push(Match {
                    start,
                    end,
                    record: idx,
                });
            }
        }
        // Stable: ties keep the original discrepancy order.
        matches.sort_by_key(|m| m.start);

        let mut segments: Vec<Segment> = Vec::new();
        let mut cursor = 0usize;
        for m in &matches {
            if m.start < cursor {
                // Overlaps an already-emitted highlight; first-found-wins.
                continue;
            }
            if m.start > cursor {
                segments.push(Segment::Plain {
                    text: para[cursor..m.start].to_string(),
                });
            }
            segments.push(Segment::Highlight {
                text: para[m.start..m.end].to_string(),
                record: m.record,
                color_group: m.record % PALETTE_SIZE,
            });
            cursor = m.end;
        }
        if cursor < para.len() {
            segments.push(Segment::Plain {
                text: para[cursor..].to_string(),
            });
        }
        if segments.is_empty() {
            segments.push(Segment::Plain {
                text: para.to_string(),
            });
        }

        out.push(AnnotatedParagraph {
            start: p_start,
            end: p_end,
            segments,
        });
    }

    out
}
