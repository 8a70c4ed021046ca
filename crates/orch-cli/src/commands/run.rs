//! `orch run submit|get|list` and `orch stats` — thin wrappers over the
//! control plane's run endpoints.

use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use super::{print_or_fail, CliClient};

pub async fn submit(
    client: &CliClient,
    owner: String,
    name: String,
    issue: i64,
    requestor: String,
    pr_mode: String,
    goal: Option<String>,
    idempotency_key: Option<String>,
) -> Result<()> {
    let key = idempotency_key.unwrap_or_else(|| Uuid::new_v4().to_string());

    let body = json!({
        "repo": { "owner": owner, "name": name },
        "issue": { "number": issue },
        "requestor": requestor,
        "prMode": pr_mode,
        "goal": goal,
    });

    let req = client
        .http
        .post(client.url("/v1/runs"))
        .header("Idempotency-Key", &key)
        .json(&body);
    let resp = client.authed(req).send().await?;
    eprintln!("idempotency_key={key}");
    print_or_fail(resp).await?;
    Ok(())
}

pub async fn get(client: &CliClient, id: &str) -> Result<()> {
    let req = client.http.get(client.url(&format!("/v1/runs/{id}")));
    let resp = client.authed(req).send().await?;
    print_or_fail(resp).await?;
    Ok(())
}

pub async fn list(client: &CliClient, status: Option<String>, repo: Option<String>, limit: i64) -> Result<()> {
    let mut req = client.http.get(client.url("/v1/runs")).query(&[("limit", limit.to_string())]);
    if let Some(status) = status {
        req = req.query(&[("status", status)]);
    }
    if let Some(repo) = repo {
        req = req.query(&[("repo", repo)]);
    }
    let resp = client.authed(req).send().await?;
    print_or_fail(resp).await?;
    Ok(())
}

pub async fn stats(client: &CliClient) -> Result<()> {
    let req = client.http.get(client.url("/v1/stats"));
    let resp = client.authed(req).send().await?;
    print_or_fail(resp).await?;
    Ok(())
}
