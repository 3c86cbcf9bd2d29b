use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub mod annotate;
pub mod model;
pub mod store;

pub use model::{AnalysisResult, DiscrepancyKind, DiscrepancyRecord, SourceResolution};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    Validation(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("empty content: {0}")]
    Parse(String),
    #[error("analysis failed: {0}")]
    Analysis(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Stable taxonomy kind for user-visible failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Fetch(_) => "fetch",
            Error::Parse(_) => "parse",
            Error::Analysis(_) => "analysis",
            Error::NotConfigured(_) => "not_configured",
            Error::Cancelled => "cancelled",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the operation (network + body read).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
    /// Optional headers to add (best-effort; adapter may drop invalid ones).
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            max_bytes: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl FetchResponse {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// Boundary to the language-analysis service.
///
/// Contract: the returned `post_text` echoes the input post text verbatim
/// (callers enforce this; the annotator depends on exact-substring
/// anchoring against the original text, never a paraphrase).
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, post_text: &str, ground_truth: &str) -> Result<AnalysisResult>;
}

/// Cooperative cancellation handle for a pipeline run.
///
/// Cloneable; all clones observe the same flag. Checked before each
/// network call, so an abandoned run stops at the next suspension point
/// with nothing to roll back.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
