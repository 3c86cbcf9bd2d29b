//! Ground-truth source resolution.
//!
//! A translated post usually links its original article somewhere in the
//! body. Resolution is strictly best-effort: any failure here degrades to
//! the post's own text as ground truth and must never abort the pipeline,
//! so this module returns `SourceResolution` instead of `Result`.

use crate::extract::extract_text_cascade;
use transcheck_core::{FetchBackend, FetchRequest, SourceResolution};

/// Content-region heuristics for arbitrary third-party pages, tried in
/// priority order; the document body is the universal fallback.
pub const CONTENT_SELECTORS: &[&str] = &["article", "main", ".post-content", ".entry-content"];

const REMOVE_SELECTORS: &[&str] = &["script", "style"];

/// First absolute HTTP(S) URL token in `text`: earliest scheme occurrence
/// extended greedily to the next whitespace.
pub fn first_url_token(text: &str) -> Option<&str> {
    let http = text.find("http://");
    let https = text.find("https://");
    let start = match (http, https) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let rest = &text[start..];
    let end = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Locate, fetch, and extract the source document referenced by
/// `post_text`.
///
/// No URL in the post is a normal outcome, not a failure. Fetch or
/// extraction problems are logged and swallowed.
pub async fn resolve_source(
    fetcher: &dyn FetchBackend,
    post_text: &str,
    timeout_ms: u64,
    max_bytes: u64,
) -> SourceResolution {
    let Some(url) = first_url_token(post_text) else {
        tracing::debug!("no source url found in post");
        return SourceResolution::NotFound;
    };
    tracing::debug!(url, "source url found, fetching");

    let mut req = FetchRequest::new(url);
    req.timeout_ms = Some(timeout_ms);
    req.max_bytes = Some(max_bytes);

    let resp = match fetcher.fetch(&req).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(url, error = %e, "source fetch failed, falling back to post text");
            return SourceResolution::NotFound;
        }
    };
    if !resp.is_success() {
        tracing::warn!(url, status = resp.status, "source fetch returned non-success status");
        return SourceResolution::NotFound;
    }

    let text = extract_text_cascade(&resp.text_lossy(), CONTENT_SELECTORS, REMOVE_SELECTORS, true);
    if text.is_empty() {
        tracing::warn!(url, "source extraction yielded no text");
        return SourceResolution::NotFound;
    }
    SourceResolution::Found(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpFetcher;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn url_token_scan() {
        assert_eq!(
            first_url_token("source: https://example.com/a?b=1 end"),
            Some("https://example.com/a?b=1")
        );
        assert_eq!(
            first_url_token("http://a.example first, https://b.example second"),
            Some("http://a.example")
        );
        assert_eq!(first_url_token("https://tail.example"), Some("https://tail.example"));
        assert_eq!(first_url_token("no links here"), None);
    }

    #[tokio::test]
    async fn no_url_in_post_is_not_found() {
        let fetcher = HttpFetcher::new().unwrap();
        let r = resolve_source(&fetcher, "plain text only", 1_000, 1_000_000).await;
        assert_eq!(r, SourceResolution::NotFound);
    }

    #[tokio::test]
    async fn unreachable_source_degrades_to_not_found() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new().unwrap();
        let post = format!("第一段\n\n來源: http://{addr}/story 第二段");
        let r = resolve_source(&fetcher, &post, 1_000, 1_000_000).await;
        assert_eq!(r, SourceResolution::NotFound);
    }

    #[tokio::test]
    async fn non_success_status_degrades_to_not_found() {
        let app = Router::new().route(
            "/gone",
            get(|| async { (axum::http::StatusCode::NOT_FOUND, "nope") }),
        );
        let addr = serve(app).await;

        let fetcher = HttpFetcher::new().unwrap();
        let post = format!("see http://{addr}/gone");
        let r = resolve_source(&fetcher, &post, 2_000, 1_000_000).await;
        assert_eq!(r, SourceResolution::NotFound);
    }

    #[tokio::test]
    async fn extracts_article_region_with_collapsed_whitespace() {
        let app = Router::new().route(
            "/story",
            get(|| async {
                "<html><body><nav>menu</nav><article>The   original\n\nstory text.</article></body></html>"
            }),
        );
        let addr = serve(app).await;

        let fetcher = HttpFetcher::new().unwrap();
        let post = format!("翻譯如下\n\nhttp://{addr}/story");
        let r = resolve_source(&fetcher, &post, 2_000, 1_000_000).await;
        assert_eq!(
            r,
            SourceResolution::Found("The original story text.".to_string())
        );
    }

    #[tokio::test]
    async fn falls_back_to_body_when_no_selector_matches() {
        let app = Router::new().route(
            "/story",
            get(|| async { "<html><body>bare body text</body></html>" }),
        );
        let addr = serve(app).await;

        let fetcher = HttpFetcher::new().unwrap();
        let post = format!("http://{addr}/story");
        let r = resolve_source(&fetcher, &post, 2_000, 1_000_000).await;
        assert_eq!(r, SourceResolution::Found("bare body text".to_string()));
    }

    #[tokio::test]
    async fn empty_page_degrades_to_not_found() {
        let app = Router::new().route("/story", get(|| async { "<html><body>  </body></html>" }));
        let addr = serve(app).await;

        let fetcher = HttpFetcher::new().unwrap();
        let post = format!("http://{addr}/story");
        let r = resolve_source(&fetcher, &post, 2_000, 1_000_000).await;
        assert_eq!(r, SourceResolution::NotFound);
    }
}
