#![allow(clippy::unwrap_used, clippy::panic)]
//! End-to-end behavior of follow-up edits.

use sitepatch_core::markers::{
    DIVIDER, NEW_PAGE_END, NEW_PAGE_START, REPLACE_END, SEARCH_START, UPDATE_PAGE_END,
    UPDATE_PAGE_START,
};
use sitepatch_core::{
    Config, EditRequest, LineRange, LmStudioClient, ModelTransport, Page, PageStore, SiteEditor,
    apply_response,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn home() -> PageStore {
    PageStore::from_pages([Page::new("/", "<body><h1>Hi</h1></body>")])
}

fn block(search: &str, replace: &str) -> String {
    format!("{SEARCH_START}{search}{DIVIDER}{replace}{REPLACE_END}")
}

#[test]
fn update_region_replaces_heading() {
    let mut store = home();
    let response = format!(
        "{UPDATE_PAGE_START}/{UPDATE_PAGE_END}{}",
        block("<h1>Hi</h1>", "<h1>Hello</h1>")
    );

    let outcome = apply_response(&mut store, &response).unwrap();

    assert_eq!(
        store.into_pages(),
        vec![Page::new("/", "<body><h1>Hello</h1></body>")]
    );
    assert_eq!(outcome.updated_lines, vec![LineRange::new(1, 1)]);
}

#[test]
fn missing_search_text_changes_nothing() {
    let mut store = home();
    let response = format!(
        "{UPDATE_PAGE_START}/{UPDATE_PAGE_END}{}",
        block("<h2>Nope</h2>", "<h2>Yes</h2>")
    );

    let outcome = apply_response(&mut store, &response).unwrap();

    assert_eq!(store, home());
    assert!(outcome.updated_lines.is_empty());
    assert_eq!(outcome.report.blocks_missed, 1);
}

#[test]
fn new_page_region_appends_fenced_document() {
    let mut store = home();
    let response = format!(
        "Sure, here is the page.\n{NEW_PAGE_START}/about.html{NEW_PAGE_END}\n\
         ```html\n<!DOCTYPE html>\n<html><body><h1>About</h1></body></html>\n```\n\
         Let me know if you need anything else."
    );

    let outcome = apply_response(&mut store, &response).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(
        store.get("/about.html").map(|p| p.html.as_str()),
        Some("<!DOCTYPE html>\n<html><body><h1>About</h1></body></html>")
    );
    assert_eq!(store.get("/").map(|p| p.html.as_str()), Some("<body><h1>Hi</h1></body>"));
    assert!(outcome.updated_lines.is_empty());
    assert_eq!(outcome.report.pages_created, 1);
}

#[test]
fn bare_blocks_fall_back_to_primary_page() {
    let mut store = PageStore::from_pages([
        Page::new("/about.html", "<h1>Hi</h1>"),
        Page::new("/", "<body><h1>Hi</h1></body>"),
    ]);
    let response = format!("Changed the greeting:\n{}", block("<h1>Hi</h1>", "<h1>Hey</h1>"));

    let outcome = apply_response(&mut store, &response).unwrap();

    assert!(outcome.report.legacy_fallback);
    assert_eq!(store.get("/").map(|p| p.html.as_str()), Some("<body><h1>Hey</h1></body>"));
    assert_eq!(store.get("/about.html").map(|p| p.html.as_str()), Some("<h1>Hi</h1>"));
    assert_eq!(outcome.updated_lines, vec![LineRange::new(1, 1)]);
}

#[test]
fn mixed_response_creates_then_links() {
    let mut store = PageStore::from_pages([Page::new(
        "/",
        "<html>\n<nav>\n<a href=\"/\">Home</a>\n</nav>\n</html>",
    )]);
    let response = format!(
        "{NEW_PAGE_START}/contact.html{NEW_PAGE_END}\n```html\n<h1>Contact</h1>\n```\n\
         {UPDATE_PAGE_START}/{UPDATE_PAGE_END}\n{}",
        block(
            "<a href=\"/\">Home</a>",
            "<a href=\"/\">Home</a>\n<a href=\"/contact.html\">Contact</a>"
        )
    );

    let outcome = apply_response(&mut store, &response).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(
        store.get("/").map(|p| p.html.as_str()),
        Some("<html>\n<nav>\n<a href=\"/\">Home</a>\n<a href=\"/contact.html\">Contact</a>\n</nav>\n</html>")
    );
    assert_eq!(outcome.updated_lines, vec![LineRange::new(3, 4)]);
    assert!(!outcome.report.legacy_fallback);
}

fn sse_body(content: &str) -> String {
    let mut body = String::new();
    for line in content.split_inclusive('\n') {
        let chunk = serde_json::json!({ "choices": [{ "delta": { "content": line } }] });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn edit_round_trip_through_lm_studio() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": "qwen2.5-coder" }, { "id": "text-embedding-3" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = format!(
        "{UPDATE_PAGE_START}/{UPDATE_PAGE_END}\n{}",
        block("<h1>Hi</h1>", "<h1>Bonjour ✓</h1>")
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&answer)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport: Arc<dyn ModelTransport> =
        Arc::new(LmStudioClient::with_base_url(server.uri(), Duration::from_secs(5))?);
    let editor = SiteEditor::new(transport, &Config::default());

    let request = EditRequest {
        prompt: Some("say hello in French".into()),
        pages: home().into_pages(),
        model: Some("qwen2.5-coder".into()),
        provider: Some("auto".into()),
        ..EditRequest::default()
    };
    let response = editor.edit(&request).await?;

    assert_eq!(response.pages[0].html, "<body><h1>Bonjour ✓</h1></body>");
    assert_eq!(response.updated_lines, vec![LineRange::new(1, 1)]);
    Ok(())
}
