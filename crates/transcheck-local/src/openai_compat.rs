//! OpenAI-compatible `chat/completions` analyzer adapter.
//!
//! Works against any endpoint speaking the OpenAI chat API (including
//! self-hosted gateways). JSON output is requested via
//! `response_format: json_object` and the prompt spells out the schema;
//! the reply content must deserialize into `AnalysisResult`.

use serde::{Deserialize, Serialize};
use transcheck_core::{AnalysisResult, Error, Result};

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

const SYSTEM_PROMPT: &str = "You are a strict, meticulous, and professional localization editor. \
Your task is to analyze a forum post that contains a user-provided translation (in Traditional \
Chinese). The original source text is also provided for comparison. Your standards are very high.";

#[derive(Debug, Clone)]
pub struct OpenAiCompatAnalyzer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_ms: u64,
}

impl OpenAiCompatAnalyzer {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            timeout_ms,
        }
    }

    pub fn from_env(client: reqwest::Client, timeout_ms: u64) -> Result<Self> {
        let base_url = env("TRANSCHECK_OPENAI_COMPAT_BASE_URL").ok_or_else(|| {
            Error::NotConfigured("missing TRANSCHECK_OPENAI_COMPAT_BASE_URL".to_string())
        })?;
        let model = env("TRANSCHECK_OPENAI_COMPAT_MODEL").ok_or_else(|| {
            Error::NotConfigured("missing TRANSCHECK_OPENAI_COMPAT_MODEL".to_string())
        })?;
        let api_key = env("TRANSCHECK_OPENAI_COMPAT_API_KEY");
        Ok(Self::new(client, base_url, api_key, model, timeout_ms))
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_user_prompt(post_text: &str, ground_truth: &str) -> String {
        format!(
            "Follow these steps with extreme precision:\n\
1. Return the entire, unmodified text of the forum post in the 'full_post_text' field.\n\
2. Extract the article title from the \"標題:\" line into 'article_title', and a version \
condensed to 25 characters or fewer into 'summarized_title'.\n\
3. Using the provided 'Original Source Text' as the ground truth, compare it against the \
translation found in the 'Forum Post Text'. Identify not just obvious mistakes, but also subtle \
errors in tone, nuance, style, and cultural context. Be critical.\n\
4. For each error, list an object in 'errors_found' with fields 'type' (one of \"Semantic \
Error\", \"Omission\", \"Addition\", \"Tone Mismatch\", \"Mistranslated Term\"), \
'problematic_translation' (quoted verbatim from the forum post), 'original_sentence' (the \
corresponding sentence from the 'Original Source Text'; this is non-negotiable), \
'suggested_correction', and 'explanation'.\n\
5. Generate a concise, professional one-sentence summary in 'analysis_summary'.\n\
6. Return ONLY the JSON object, with no commentary before or after.\n\n\
---\nForum Post Text:\n{post_text}\n---\nOriginal Source Text:\n{ground_truth}\n---"
        )
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait::async_trait]
impl transcheck_core::Analyzer for OpenAiCompatAnalyzer {
    async fn analyze(&self, post_text: &str, ground_truth: &str) -> Result<AnalysisResult> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: Self::build_user_prompt(post_text, ground_truth),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut rb = self
            .client
            .post(self.endpoint())
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Analysis(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Analysis(format!("chat.completions HTTP {status}")));
        }

        let parsed: ChatCompletionsResponse = resp
            .json()
            .await
            .map_err(|e| Error::Analysis(e.to_string()))?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| Error::Analysis("chat.completions response had no choices".to_string()))?;

        serde_json::from_str::<AnalysisResult>(content)
            .map_err(|e| Error::Analysis(format!("malformed analysis payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::net::SocketAddr;
    use transcheck_core::Analyzer;

    async fn serve_content(content: String) -> SocketAddr {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let content = content.clone();
                async move {
                    Json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": content}}]
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn parses_json_object_content() {
        let inner = serde_json::json!({
            "article_title": "t",
            "full_post_text": "p",
            "analysis_summary": "s",
            "errors_found": []
        });
        let addr = serve_content(inner.to_string()).await;

        let analyzer = OpenAiCompatAnalyzer::new(
            reqwest::Client::new(),
            format!("http://{addr}"),
            Some("key".into()),
            "gpt-4-turbo",
            2_000,
        );
        let result = analyzer.analyze("p", "g").await.unwrap();
        assert_eq!(result.post_text, "p");
        assert!(result.discrepancies.is_empty());
    }

    #[tokio::test]
    async fn non_json_content_is_an_analysis_error() {
        let addr = serve_content("sorry, as a language model ...".to_string()).await;

        let analyzer = OpenAiCompatAnalyzer::new(
            reqwest::Client::new(),
            format!("http://{addr}"),
            None,
            "gpt-4-turbo",
            2_000,
        );
        let err = analyzer.analyze("p", "g").await.unwrap_err();
        assert_eq!(err.kind(), "analysis");
    }
}
