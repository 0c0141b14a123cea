#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

fn config_dir() -> &'static Path {
    static CONFIG_DIR: OnceLock<TempDir> = OnceLock::new();
    CONFIG_DIR
        .get_or_init(|| tempfile::tempdir().expect("failed to create config dir for tests"))
        .path()
}

/// Create a configured `sitepatch` command suitable for integration tests.
///
/// Points the config file at an empty temp directory and clears the
/// connection overrides so the developer's environment cannot leak in.
#[allow(dead_code)]
pub fn sitepatch_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sitepatch"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("SITEPATCH_CONFIG", config_dir().join("config.toml"));
    cmd.env_remove("LMHOST");
    cmd.env_remove("LMPORT");
    cmd.env_remove("tokenlimit");
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Like [`sitepatch_cmd`], aimed at a mock LM Studio server.
#[allow(dead_code)]
pub fn sitepatch_cmd_for(server: &wiremock::MockServer) -> Command {
    let mut cmd = sitepatch_cmd();
    let address = server.address();
    cmd.env("LMHOST", address.ip().to_string());
    cmd.env("LMPORT", address.port().to_string());
    cmd
}

/// Write `files` into a fresh project directory.
#[allow(dead_code)]
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create project dir");
    for (name, body) in files {
        std::fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

/// Event-stream body delivering `content` one line per event.
#[allow(dead_code)]
pub fn sse_body(content: &str) -> String {
    let mut body = String::new();
    for line in content.split_inclusive('\n') {
        let chunk = serde_json::json!({ "choices": [{ "delta": { "content": line } }] });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
