use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    let mut c = Command::cargo_bin("transcheck").expect("binary builds");
    // Keep host env from leaking provider config into the tests.
    c.env_remove("TRANSCHECK_GEMINI_API_KEY")
        .env_remove("TRANSCHECK_GEMINI_BASE_URL")
        .env_remove("TRANSCHECK_GEMINI_MODEL")
        .env_remove("TRANSCHECK_OPENAI_COMPAT_BASE_URL")
        .env_remove("TRANSCHECK_OPENAI_COMPAT_API_KEY")
        .env_remove("TRANSCHECK_OPENAI_COMPAT_MODEL")
        .env_remove("RUST_LOG");
    c
}

#[test]
fn version_prints_package_version() {
    cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn analyze_without_provider_config_fails_before_any_network() {
    cmd()
        .args(["analyze", "https://www.ptt.cc/bbs/Gossiping/M.1.A.2.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_configured"));
}

#[test]
fn analyze_rejects_non_article_url() {
    // URL validation happens before any request, so a dummy key is enough.
    cmd()
        .args(["analyze", "https://example.com/not-ptt"])
        .env("TRANSCHECK_GEMINI_API_KEY", "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation"));
}

#[test]
fn annotate_renders_highlights_from_a_stored_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("analysis.json");
    std::fs::write(
        &input,
        serde_json::json!({
            "article_title": "Title",
            "full_post_text": "Hello world\n\nSecond paragraph",
            "analysis_summary": "One issue found.",
            "errors_found": [{
                "type": "Omission",
                "problematic_translation": "Hello",
                "original_sentence": "Bonjour le monde",
                "suggested_correction": "Bonjour",
                "explanation": "Greeting dropped."
            }]
        })
        .to_string(),
    )
    .expect("write fixture");

    cmd()
        .args(["annotate", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"kind\":\"highlight\"")
                .and(predicate::str::contains("\"color_group\":0"))
                .and(predicate::str::contains("Second paragraph")),
        );
}

#[test]
fn annotate_missing_input_fails() {
    cmd()
        .args(["annotate", "--input", "/nonexistent/analysis.json"])
        .assert()
        .failure();
}

#[test]
fn list_on_fresh_store_prints_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    cmd()
        .args(["list", "--out"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
