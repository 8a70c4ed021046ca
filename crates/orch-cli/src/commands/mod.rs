//! Command handler modules for orch-cli.
//!
//! `db` talks to Postgres directly (same pool-connect path as the two HTTP
//! services); `repo` and `run` talk to the control plane over HTTP, since
//! that's the only component that owns idempotency and enqueue.

pub mod db;
pub mod repo;
pub mod run;

use anyhow::{Context, Result};

/// Thin HTTP client wrapper: base URL + bearer secret, both read from the
/// environment once at startup so every subcommand shares one source of
/// truth instead of re-reading env vars per call.
pub struct CliClient {
    pub http: reqwest::Client,
    pub base_url: String,
    pub bearer_secret: String,
}

impl CliClient {
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("ORCH_CLI_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8081".to_string());
        let bearer_secret = std::env::var("ORCH_CONTROL_PLANE_SECRET")
            .context("missing required environment variable ORCH_CONTROL_PLANE_SECRET")?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            bearer_secret,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.bearer_secret)
    }
}

/// Prints a response body as pretty JSON, or raises an error describing the
/// non-2xx status and body for the user.
pub async fn print_or_fail(resp: reqwest::Response) -> Result<serde_json::Value> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);

    if !status.is_success() {
        anyhow::bail!("request failed: {} {}", status, serde_json::to_string(&body).unwrap_or_default());
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(body)
}
