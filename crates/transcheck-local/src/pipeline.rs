//! Pipeline orchestration: post acquisition → source resolution →
//! analysis.
//!
//! One `submit` call is one run. Stages execute strictly sequentially;
//! runs are independent, so a shared `Pipeline` can serve concurrent runs
//! without locking. Nothing is retried inside a run and nothing is
//! persisted before `Done`; a failed run is simply resubmitted fresh.

use crate::{ptt, source};
use serde::Serialize;
use std::sync::Arc;
use transcheck_core::{AnalysisResult, Analyzer, CancelToken, Error, FetchBackend, Result};

/// States of a single run. Only post acquisition and analysis can fail
/// the run; source resolution degrades instead (its failure policy lives
/// in `source`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Fetching,
    ResolvingSource,
    Analyzing,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PipelineCfg {
    pub fetch_timeout_ms: u64,
    pub source_timeout_ms: u64,
    pub max_fetch_bytes: u64,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            source_timeout_ms: 10_000,
            max_fetch_bytes: 2 * 1024 * 1024,
        }
    }
}

pub struct Pipeline {
    fetcher: Arc<dyn FetchBackend>,
    analyzer: Arc<dyn Analyzer>,
    cfg: PipelineCfg,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn FetchBackend>, analyzer: Arc<dyn Analyzer>, cfg: PipelineCfg) -> Self {
        Self {
            fetcher,
            analyzer,
            cfg,
        }
    }

    fn transition(state: &mut RunState, next: RunState) {
        tracing::debug!(from = ?*state, to = ?next, "pipeline state");
        *state = next;
    }

    /// Run the full pipeline for one submitted URL.
    ///
    /// The URL is validated against the PTT article pattern before any IO;
    /// cancellation is checked before each network call.
    pub async fn submit(&self, url: &str, cancel: &CancelToken) -> Result<AnalysisResult> {
        let mut state = RunState::Idle;
        let out = self.run(url, cancel, &mut state).await;
        match &out {
            Ok(_) => Self::transition(&mut state, RunState::Done),
            Err(e) => {
                tracing::debug!(kind = e.kind(), "pipeline run failed");
                Self::transition(&mut state, RunState::Failed);
            }
        }
        out
    }

    async fn run(
        &self,
        url: &str,
        cancel: &CancelToken,
        state: &mut RunState,
    ) -> Result<AnalysisResult> {
        if !ptt::is_article_url(url) {
            return Err(Error::Validation(format!(
                "not a ptt article url (expected ptt.cc/bbs/.../*.html): {url}"
            )));
        }

        Self::transition(state, RunState::Fetching);
        cancel.check()?;
        let post_text = ptt::fetch_post(
            self.fetcher.as_ref(),
            url,
            self.cfg.fetch_timeout_ms,
            self.cfg.max_fetch_bytes,
        )
        .await?;

        Self::transition(state, RunState::ResolvingSource);
        cancel.check()?;
        let resolution = source::resolve_source(
            self.fetcher.as_ref(),
            &post_text,
            self.cfg.source_timeout_ms,
            self.cfg.max_fetch_bytes,
        )
        .await;
        let ground_truth = resolution.text().unwrap_or(&post_text).to_string();

        Self::transition(state, RunState::Analyzing);
        cancel.check()?;
        let mut result = self.analyzer.analyze(&post_text, &ground_truth).await?;

        // The annotator anchors against the original text; repair a
        // paraphrased echo rather than letting every span silently miss.
        if result.post_text != post_text {
            tracing::warn!("analyzer did not echo the post text verbatim; substituting the input");
            result.post_text = post_text;
        }
        Ok(result)
    }
}
