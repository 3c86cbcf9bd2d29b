//! Gemini `generateContent` analyzer adapter.
//!
//! Asks for `application/json` output constrained by a response schema, so
//! the reply parses straight into `AnalysisResult`. Anything off-contract
//! (transport failure, unexpected envelope, schema-invalid payload) is an
//! analysis error.

use serde::Deserialize;
use transcheck_core::{AnalysisResult, Error, Result};

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
}

impl GeminiAnalyzer {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_ms,
        }
    }

    pub fn from_env(client: reqwest::Client, timeout_ms: u64) -> Result<Self> {
        let api_key = env("TRANSCHECK_GEMINI_API_KEY").ok_or_else(|| {
            Error::NotConfigured("missing TRANSCHECK_GEMINI_API_KEY".to_string())
        })?;
        let base_url = env("TRANSCHECK_GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = env("TRANSCHECK_GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self::new(client, base_url, api_key, model, timeout_ms))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }

    fn build_prompt(post_text: &str, ground_truth: &str) -> String {
        format!(
            "You are a strict, meticulous, and professional localization editor. \
Your task is to analyze a forum post that contains a user-provided translation \
(in Traditional Chinese). The original source text is also provided for \
comparison. Your standards are very high.\n\n\
Follow these steps with extreme precision:\n\
1. Extract the article title from the \"標題:\" line of the forum post into `article_title`.\n\
2. Create a `summarized_title`: identical to `article_title` when it is 25 characters or less, \
otherwise a concise summary under 25 characters.\n\
3. Return the entire, unmodified text of the forum post in `full_post_text`.\n\
4. Using the provided 'Original Source Text' as the ground truth, compare it against the \
translation in the 'Forum Post Text'. Identify all errors in tone, nuance, style, and accuracy.\n\
5. For each error, quote the problematic translation verbatim from the forum post in \
`problematic_translation`, and provide the corresponding sentence from the 'Original Source Text' \
in `original_sentence`.\n\
6. Generate a concise, professional one-sentence summary of the translation quality in \
`analysis_summary`.\n\
7. Return your complete analysis ONLY in the specified JSON format.\n\n\
---\nForum Post Text:\n{post_text}\n---\nOriginal Source Text:\n{ground_truth}\n---"
        )
    }

    fn build_payload(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "article_title": {"type": "STRING"},
                        "summarized_title": {"type": "STRING"},
                        "full_post_text": {"type": "STRING"},
                        "analysis_summary": {"type": "STRING"},
                        "errors_found": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "type": {
                                        "type": "STRING",
                                        "enum": ["Semantic Error", "Omission", "Addition", "Tone Mismatch", "Mistranslated Term"]
                                    },
                                    "problematic_translation": {"type": "STRING"},
                                    "original_sentence": {"type": "STRING"},
                                    "suggested_correction": {"type": "STRING"},
                                    "explanation": {"type": "STRING"}
                                },
                                "required": ["type", "problematic_translation", "original_sentence", "suggested_correction", "explanation"]
                            }
                        }
                    },
                    "required": ["article_title", "summarized_title", "full_post_text", "analysis_summary", "errors_found"]
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

#[async_trait::async_trait]
impl transcheck_core::Analyzer for GeminiAnalyzer {
    async fn analyze(&self, post_text: &str, ground_truth: &str) -> Result<AnalysisResult> {
        let prompt = Self::build_prompt(post_text, ground_truth);
        let payload = Self::build_payload(&prompt);

        let resp = self
            .client
            .post(self.endpoint())
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Analysis(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Analysis(format!(
                "gemini generateContent HTTP {status}"
            )));
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| Error::Analysis(e.to_string()))?;
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| {
                Error::Analysis("gemini response had no candidate content".to_string())
            })?;

        serde_json::from_str::<AnalysisResult>(text)
            .map_err(|e| Error::Analysis(format!("malformed analysis payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::net::SocketAddr;
    use transcheck_core::{Analyzer, DiscrepancyKind};

    fn envelope(inner: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": inner.to_string()}]}
            }]
        })
    }

    async fn serve_analysis(body: serde_json::Value) -> SocketAddr {
        let app = Router::new().route(
            "/v1beta/models/gemini-2.0-flash:generateContent",
            post(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn analyzer(addr: SocketAddr) -> GeminiAnalyzer {
        GeminiAnalyzer::new(
            reqwest::Client::new(),
            format!("http://{addr}"),
            "test-key",
            "gemini-2.0-flash",
            2_000,
        )
    }

    #[tokio::test]
    async fn parses_schema_conforming_response() {
        let inner = serde_json::json!({
            "article_title": "[翻譯] title",
            "summarized_title": "title",
            "full_post_text": "post body",
            "analysis_summary": "one issue",
            "errors_found": [{
                "type": "Omission",
                "problematic_translation": "body",
                "original_sentence": "the body",
                "suggested_correction": "本文",
                "explanation": "dropped a word"
            }]
        });
        let addr = serve_analysis(envelope(&inner)).await;

        let result = analyzer(addr).analyze("post body", "ground").await.unwrap();
        assert_eq!(result.title, "[翻譯] title");
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].kind, DiscrepancyKind::Omission);
    }

    #[tokio::test]
    async fn missing_errors_found_is_an_analysis_error() {
        let inner = serde_json::json!({
            "article_title": "t",
            "full_post_text": "p",
            "analysis_summary": "s"
        });
        let addr = serve_analysis(envelope(&inner)).await;

        let err = analyzer(addr).analyze("p", "g").await.unwrap_err();
        assert_eq!(err.kind(), "analysis");
    }

    #[tokio::test]
    async fn unrecognized_kind_is_an_analysis_error() {
        let inner = serde_json::json!({
            "article_title": "t",
            "full_post_text": "p",
            "analysis_summary": "s",
            "errors_found": [{
                "type": "Typo",
                "problematic_translation": "p",
                "original_sentence": "o",
                "suggested_correction": "c",
                "explanation": "e"
            }]
        });
        let addr = serve_analysis(envelope(&inner)).await;

        let err = analyzer(addr).analyze("p", "g").await.unwrap_err();
        assert_eq!(err.kind(), "analysis");
    }

    #[tokio::test]
    async fn empty_candidates_is_an_analysis_error() {
        let addr = serve_analysis(serde_json::json!({"candidates": []})).await;
        let err = analyzer(addr).analyze("p", "g").await.unwrap_err();
        assert_eq!(err.kind(), "analysis");
    }

    #[tokio::test]
    async fn http_error_is_an_analysis_error() {
        let app = Router::new().route(
            "/v1beta/models/gemini-2.0-flash:generateContent",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let err = analyzer(addr).analyze("p", "g").await.unwrap_err();
        assert_eq!(err.kind(), "analysis");
    }
}
