//! `orch repo register` / `orch run submit` against a live control plane
//! process. Skipped when `ORCH_DATABASE_URL` isn't set, since both the
//! control plane and the CLI need a real Postgres to talk to.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::time::Duration;

const PORT: u16 = 18099;
const SECRET: &str = "cli-test-secret";

#[tokio::test]
async fn repo_register_then_run_submit_reaches_control_plane() -> anyhow::Result<()> {
    let url = match std::env::var(orch_store::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: ORCH_DATABASE_URL not set");
            return Ok(());
        }
    };

    let addr = format!("127.0.0.1:{PORT}");
    let base_url = format!("http://{addr}");

    let mut server = std::process::Command::cargo_bin("orch-control-plane")?
        .env(orch_store::ENV_DB_URL, &url)
        .env("ORCH_CONTROL_PLANE_SECRET", SECRET)
        .env("ORCH_CONTROL_PLANE_ADDR", &addr)
        .spawn()?;

    let client = reqwest::Client::new();
    let mut ready = false;
    for _ in 0..50 {
        if client.get(format!("{base_url}/healthz")).send().await.is_ok() {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if !ready {
        let _ = server.kill();
        anyhow::bail!("control plane never became healthy");
    }

    let owner = format!("cli-owner-{}", uuid::Uuid::new_v4());
    let name = format!("cli-repo-{}", uuid::Uuid::new_v4());

    let mut register_cmd = assert_cmd::Command::cargo_bin("orch")?;
    register_cmd
        .env("ORCH_CLI_BASE_URL", &base_url)
        .env("ORCH_CONTROL_PLANE_SECRET", SECRET)
        .args(["repo", "register", "--owner", &owner, "--name", &name]);
    register_cmd.assert().success().stdout(predicate::str::contains("\"owner\""));

    let mut submit_cmd = assert_cmd::Command::cargo_bin("orch")?;
    submit_cmd.env("ORCH_CLI_BASE_URL", &base_url).env("ORCH_CONTROL_PLANE_SECRET", SECRET).args([
        "run",
        "submit",
        "--owner",
        &owner,
        "--name",
        &name,
        "--issue",
        "7",
        "--requestor",
        "cli-test",
    ]);
    submit_cmd.assert().success().stdout(predicate::str::contains("\"status\": \"queued\""));

    let _ = server.kill();
    Ok(())
}
