//! `orch repo register` / `orch repo list` — thin wrappers over
//! `POST /v1/repos` and `GET /v1/repos`.

use anyhow::Result;
use serde_json::json;

use super::{print_or_fail, CliClient};

pub async fn register(
    client: &CliClient,
    owner: String,
    name: String,
    default_branch: Option<String>,
    config_path: Option<String>,
) -> Result<()> {
    let body = json!({
        "owner": owner,
        "name": name,
        "defaultBranch": default_branch,
        "configPath": config_path,
    });

    let req = client.http.post(client.url("/v1/repos")).json(&body);
    let resp = client.authed(req).send().await?;
    print_or_fail(resp).await?;
    Ok(())
}

pub async fn list(client: &CliClient) -> Result<()> {
    let req = client.http.get(client.url("/v1/repos"));
    let resp = client.authed(req).send().await?;
    print_or_fail(resp).await?;
    Ok(())
}
