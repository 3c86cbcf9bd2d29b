//! Data model shared between the pipeline stages and the analyzer wire
//! format.
//!
//! Field names on the wire follow the analysis service's JSON schema
//! (`article_title`, `full_post_text`, `errors_found`, ...), so an
//! `AnalysisResult` deserializes straight from the service response.

use serde::{Deserialize, Serialize};

/// Closed classification of translation discrepancies.
///
/// The wire values are the human-readable strings the analysis service is
/// constrained to emit. An unrecognized value fails deserialization, which
/// surfaces as an analysis error rather than a silently unstyled span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscrepancyKind {
    #[serde(rename = "Semantic Error")]
    SemanticError,
    #[serde(rename = "Omission")]
    Omission,
    #[serde(rename = "Addition")]
    Addition,
    #[serde(rename = "Tone Mismatch")]
    ToneMismatch,
    #[serde(rename = "Mistranslated Term")]
    MistranslatedTerm,
}

impl DiscrepancyKind {
    pub const ALL: [DiscrepancyKind; 5] = [
        DiscrepancyKind::SemanticError,
        DiscrepancyKind::Omission,
        DiscrepancyKind::Addition,
        DiscrepancyKind::ToneMismatch,
        DiscrepancyKind::MistranslatedTerm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyKind::SemanticError => "Semantic Error",
            DiscrepancyKind::Omission => "Omission",
            DiscrepancyKind::Addition => "Addition",
            DiscrepancyKind::ToneMismatch => "Tone Mismatch",
            DiscrepancyKind::MistranslatedTerm => "Mistranslated Term",
        }
    }

    /// CSS class hook for presentation layers, maintained alongside the
    /// enum so adding a kind is a compile-time-checked change.
    pub fn css_class(&self) -> &'static str {
        match self {
            DiscrepancyKind::SemanticError => "discrepancy-semantic",
            DiscrepancyKind::Omission => "discrepancy-omission",
            DiscrepancyKind::Addition => "discrepancy-addition",
            DiscrepancyKind::ToneMismatch => "discrepancy-tone",
            DiscrepancyKind::MistranslatedTerm => "discrepancy-term",
        }
    }
}

/// One flagged difference between the translation and its ground truth.
///
/// Immutable once produced by the analyzer. `problematic_text` must occur
/// verbatim in the post text to be anchorable; the annotator re-validates
/// this and drops unanchorable records rather than failing a render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyRecord {
    #[serde(rename = "type")]
    pub kind: DiscrepancyKind,
    #[serde(rename = "problematic_translation")]
    pub problematic_text: String,
    #[serde(rename = "original_sentence")]
    pub ground_truth_sentence: String,
    pub suggested_correction: String,
    pub explanation: String,
}

/// Structured result of one analyzer call. Owned by the caller once
/// returned; the pipeline does not retain it.
///
/// Invariant: `post_text` equals the post text supplied to the analyzer
/// (the pipeline repairs a divergent echo before handing the result out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "article_title")]
    pub title: String,
    /// Title condensed to 25 chars or fewer when the original is longer.
    #[serde(rename = "summarized_title", skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub summarized_title: Option<String>,
    #[serde(rename = "full_post_text")]
    pub post_text: String,
    #[serde(rename = "analysis_summary")]
    pub summary: String,
    // No serde default: a response missing `errors_found` is malformed.
    #[serde(rename = "errors_found")]
    pub discrepancies: Vec<DiscrepancyRecord>,
}

/// Outcome of source resolution. Ephemeral; produced once per run and
/// consumed immediately by the analyzer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceResolution {
    Found(String),
    NotFound,
}

impl SourceResolution {
    pub fn text(&self) -> Option<&str> {
        match self {
            SourceResolution::Found(t) => Some(t),
            SourceResolution::NotFound => None,
        }
    }

    pub fn found(&self) -> bool {
        matches!(self, SourceResolution::Found(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_wire_names() {
        for k in DiscrepancyKind::ALL {
            let s = serde_json::to_string(&k).unwrap();
            assert_eq!(s, format!("\"{}\"", k.as_str()));
            let back: DiscrepancyKind = serde_json::from_str(&s).unwrap();
            assert_eq!(back, k);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let r = serde_json::from_str::<DiscrepancyKind>("\"Typo\"");
        assert!(r.is_err());
    }

    #[test]
    fn analysis_result_deserializes_from_wire_shape() {
        let raw = serde_json::json!({
            "article_title": "[翻譯] Some article",
            "summarized_title": "Some article",
            "full_post_text": "第一段。\n\n第二段。",
            "analysis_summary": "Mostly accurate with one tone issue.",
            "errors_found": [{
                "type": "Tone Mismatch",
                "problematic_translation": "第二段",
                "original_sentence": "The second paragraph.",
                "suggested_correction": "次段",
                "explanation": "Register is too casual."
            }]
        });
        let r: AnalysisResult = serde_json::from_value(raw).unwrap();
        assert_eq!(r.title, "[翻譯] Some article");
        assert_eq!(r.discrepancies.len(), 1);
        assert_eq!(r.discrepancies[0].kind, DiscrepancyKind::ToneMismatch);
    }

    #[test]
    fn missing_errors_found_is_malformed() {
        let raw = serde_json::json!({
            "article_title": "t",
            "full_post_text": "p",
            "analysis_summary": "s"
        });
        assert!(serde_json::from_value::<AnalysisResult>(raw).is_err());
    }

    #[test]
    fn summarized_title_is_optional() {
        let raw = serde_json::json!({
            "article_title": "t",
            "full_post_text": "p",
            "analysis_summary": "s",
            "errors_found": []
        });
        let r: AnalysisResult = serde_json::from_value(raw).unwrap();
        assert_eq!(r.summarized_title, None);
    }

    #[test]
    fn source_resolution_accessors() {
        let found = SourceResolution::Found("body".into());
        assert!(found.found());
        assert_eq!(found.text(), Some("body"));
        assert_eq!(SourceResolution::NotFound.text(), None);
    }
}
