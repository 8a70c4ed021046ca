//! Process-level environment configuration. Mirrors the daemon's
//! `.env.local` dev-convenience bootstrap plus `std::env::var` reads; kept
//! as a dedicated module so the HTTP and CLI binaries share one source of
//! truth instead of scattering `env::var` calls.

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Load `.env.local` if present. Silent when absent — production injects
/// environment variables directly rather than shipping a dotfile.
pub fn bootstrap_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderunnerMode {
    Mock,
    External,
}

impl CoderunnerMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Some(CoderunnerMode::Mock),
            "external" => Some(CoderunnerMode::External),
            _ => None,
        }
    }
}

/// Control-plane-side configuration.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub database_url: String,
    pub bearer_secret: String,
    pub bind_addr: Option<String>,
}

impl ControlPlaneConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: require_var("ORCH_DATABASE_URL")?,
            bearer_secret: require_var("ORCH_CONTROL_PLANE_SECRET")?,
            bind_addr: std::env::var("ORCH_CONTROL_PLANE_ADDR").ok(),
        })
    }
}

/// Execution-engine-side configuration, including adapter selection.
#[derive(Debug, Clone)]
pub struct ExecutionEngineConfig {
    pub database_url: String,
    pub queue_consume_secret: String,
    pub bind_addr: Option<String>,
    pub coderunner: CoderunnerConfig,
}

impl ExecutionEngineConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: require_var("ORCH_DATABASE_URL")?,
            queue_consume_secret: require_var("ORCH_QUEUE_CONSUME_SECRET")?,
            bind_addr: std::env::var("ORCH_EXECUTION_ENGINE_ADDR").ok(),
            coderunner: CoderunnerConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub enum CoderunnerConfig {
    Mock,
    External {
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    },
}

impl CoderunnerConfig {
    pub fn from_env() -> Result<Self> {
        let mode_raw = std::env::var("ORCH_CODERUNNER_MODE").unwrap_or_else(|_| "mock".to_string());
        let mode = CoderunnerMode::parse(&mode_raw)
            .with_context(|| format!("invalid ORCH_CODERUNNER_MODE: {mode_raw}"))?;

        match mode {
            CoderunnerMode::Mock => Ok(CoderunnerConfig::Mock),
            CoderunnerMode::External => {
                let base_url = require_var("ORCH_CODERUNNER_BASE_URL")?;
                let api_key = std::env::var("ORCH_CODERUNNER_API_KEY").ok();
                let timeout_secs: u64 = std::env::var("ORCH_CODERUNNER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30);
                Ok(CoderunnerConfig::External {
                    base_url,
                    api_key,
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
        }
    }
}

fn require_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        Ok(_) => bail!("environment variable {name} is set but empty"),
        Err(_) => bail!("missing required environment variable {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coderunner_mode_parses_case_insensitively() {
        assert_eq!(CoderunnerMode::parse("MOCK"), Some(CoderunnerMode::Mock));
        assert_eq!(CoderunnerMode::parse("external"), Some(CoderunnerMode::External));
        assert_eq!(CoderunnerMode::parse("bogus"), None);
    }
}
