//! PTT post acquisition.
//!
//! PTT serves article pages behind an age-consent wall; every request must
//! carry the fixed `over18=1` cookie. The article body lives in
//! `#main-content`, with author/board/title/time header lines in
//! `.article-metaline` / `.article-metaline-right` and reader comments in
//! `.push`.

use crate::extract::{extract_text, ExtractRules};
use transcheck_core::{Error, FetchBackend, FetchRequest, Result};

pub const OVER18_COOKIE: &str = "over18=1";

const CONTENT_SELECTOR: &str = "#main-content";
const REMOVE_SELECTORS: &[&str] = &[".article-metaline", ".article-metaline-right", ".push"];

/// Whether `url` points at a PTT article page (`ptt.cc/bbs/.../*.html`).
///
/// Checked before any IO; anything else is rejected as a validation error.
pub fn is_article_url(url: &str) -> bool {
    let Ok(u) = url::Url::parse(url) else {
        return false;
    };
    if !matches!(u.scheme(), "http" | "https") {
        return false;
    }
    let host_ok = matches!(u.host_str(), Some(h) if h == "ptt.cc" || h.ends_with(".ptt.cc"));
    host_ok && u.path().starts_with("/bbs/") && u.path().ends_with(".html")
}

/// Drop everything from the first PTT signature separator on (a line that
/// is exactly `--`), then drop any rendered header lines that survived
/// selector removal.
fn clean_post_text(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        if line.trim() == "--" {
            break;
        }
        let t = line.trim_start();
        if t.starts_with("作者") || t.starts_with("標題") || t.starts_with("時間") {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out.trim().to_string()
}

/// Fetch a PTT article and return its cleaned plain text.
///
/// Newlines are preserved: the annotator downstream splits the text into
/// paragraphs on blank-line runs. Transient failures propagate; there are
/// no retries at this layer.
pub async fn fetch_post(
    fetcher: &dyn FetchBackend,
    url: &str,
    timeout_ms: u64,
    max_bytes: u64,
) -> Result<String> {
    let mut req = FetchRequest::new(url);
    req.timeout_ms = Some(timeout_ms);
    req.max_bytes = Some(max_bytes);
    req.headers
        .insert("Cookie".to_string(), OVER18_COOKIE.to_string());

    let resp = fetcher.fetch(&req).await?;
    if !resp.is_success() {
        return Err(Error::Fetch(format!(
            "ptt article fetch returned HTTP {}",
            resp.status
        )));
    }

    let rules = ExtractRules {
        content_selector: Some(CONTENT_SELECTOR),
        remove_selectors: REMOVE_SELECTORS,
        collapse_whitespace: false,
    };
    let text = clean_post_text(&extract_text(&resp.text_lossy(), &rules));
    if text.is_empty() {
        return Err(Error::Parse(format!("no article content found at {url}")));
    }
    Ok(text)
}
