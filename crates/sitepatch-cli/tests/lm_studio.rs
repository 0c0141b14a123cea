#![allow(clippy::unwrap_used)]
//! Commands that talk to a (mock) LM Studio server.

mod common;

use common::{project, sitepatch_cmd_for, sse_body};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_with_models() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": "qwen2.5-coder" }, { "id": "nomic-embedding-v1" }]
        })))
        .mount(&server)
        .await;
    server
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(sse_body(content))
}

#[tokio::test]
async fn models_lists_chat_models_only() -> anyhow::Result<()> {
    let server = server_with_models().await;

    let out = sitepatch_cmd_for(&server)
        .args(["models", "-f", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: Value = serde_json::from_slice(&out)?;
    let models = v.as_array().cloned().unwrap_or_default();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0]["value"], "qwen2.5-coder");
    assert_eq!(models[0]["providers"], serde_json::json!(["lmstudio"]));
    Ok(())
}

#[test]
fn models_reports_unreachable_server() {
    // Reserve a port, then free it so nothing is listening
    let address = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    common::sitepatch_cmd()
        .env("LMHOST", address.ip().to_string())
        .env("LMPORT", address.port().to_string())
        .arg("models")
        .assert()
        .code(5);
}

#[tokio::test]
async fn edit_applies_answer_and_records_prompt() -> anyhow::Result<()> {
    let server = server_with_models().await;
    let answer = "<<<<<<< UPDATE_PAGE_START / >>>>>>> UPDATE_PAGE_END\n\
                  <<<<<<< SEARCH\n<h1>Hi</h1>\n=======\n<h1>Bonjour</h1>\n>>>>>>> REPLACE\n";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "qwen2.5-coder",
            "stream": true
        })))
        .respond_with(completion(answer))
        .expect(1)
        .mount(&server)
        .await;

    let site = project(&[
        ("index.html", "<body>\n<h1>Hi</h1>\n</body>"),
        ("prompts.txt", "a greeting page"),
    ]);

    let out = sitepatch_cmd_for(&server)
        .arg("edit")
        .arg(site.path())
        .args(["-m", "qwen2.5-coder", "-p", "in French", "-f", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: Value = serde_json::from_slice(&out)?;
    assert_eq!(v["updatedLines"], serde_json::json!([[1, 3]]));
    assert_eq!(v["pages"], serde_json::json!(["/"]));
    assert_eq!(
        fs::read_to_string(site.path().join("index.html"))?,
        "<body>\n<h1>Bonjour</h1>\n</body>"
    );
    assert_eq!(
        fs::read_to_string(site.path().join("prompts.txt"))?,
        "a greeting page\nin French"
    );
    Ok(())
}

#[tokio::test]
async fn edit_with_unknown_model_is_usage_error() {
    let server = server_with_models().await;
    let site = project(&[("index.html", "<h1>Hi</h1>")]);

    sitepatch_cmd_for(&server)
        .arg("edit")
        .arg(site.path())
        .args(["-m", "gpt-9", "-p", "anything"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid model selected"));

    assert_eq!(fs::read_to_string(site.path().join("index.html")).unwrap(), "<h1>Hi</h1>");
}

#[tokio::test]
async fn edit_quota_error_is_model_error() {
    let server = server_with_models().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string("You have exceeded your monthly included credits"),
        )
        .mount(&server)
        .await;
    let site = project(&[("index.html", "<h1>Hi</h1>")]);

    sitepatch_cmd_for(&server)
        .arg("edit")
        .arg(site.path())
        .args(["-m", "qwen2.5-coder", "-p", "anything"])
        .assert()
        .code(4);
}

#[tokio::test]
async fn generate_streams_and_saves_fenced_document() -> anyhow::Result<()> {
    let server = server_with_models().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(
            "Here you go:\n```html\n<!DOCTYPE html>\n<h1>Bakery</h1>\n```\n",
        ))
        .expect(1)
        .mount(&server)
        .await;
    let site = tempfile::tempdir()?;
    let target = site.path().join("bakery");

    sitepatch_cmd_for(&server)
        .arg("generate")
        .arg(&target)
        .args(["-m", "qwen2.5-coder", "-p", "a bakery", "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h1>Bakery</h1>"));

    assert_eq!(
        fs::read_to_string(target.join("index.html"))?,
        "<!DOCTYPE html>\n<h1>Bakery</h1>"
    );
    assert_eq!(fs::read_to_string(target.join("prompts.txt"))?, "a bakery");
    Ok(())
}

#[tokio::test]
async fn generate_without_prompt_is_rejected() {
    let server = server_with_models().await;
    let site = tempfile::tempdir().unwrap();

    sitepatch_cmd_for(&server)
        .arg("generate")
        .arg(site.path())
        .args(["-m", "qwen2.5-coder"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Missing required fields"));
}
