//! Builds the configured [`CoderunnerAdapter`] from [`orch_config::CoderunnerConfig`].
//! Kept separate from `main.rs` so `orch-testkit` can build the same adapter
//! choice without duplicating the match.

use std::sync::Arc;

use orch_coderunner::{CoderunnerAdapter, ExternalCoderunnerAdapter, MockCoderunnerAdapter};
use orch_config::CoderunnerConfig;

pub fn build_adapter(config: &CoderunnerConfig) -> anyhow::Result<Arc<dyn CoderunnerAdapter>> {
    match config {
        CoderunnerConfig::Mock => Ok(Arc::new(MockCoderunnerAdapter::new())),
        CoderunnerConfig::External { base_url, api_key, timeout } => {
            let adapter = ExternalCoderunnerAdapter::new(base_url.clone(), api_key.clone(), *timeout)
                .map_err(|e| anyhow::anyhow!("failed to build external coderunner adapter: {}", e.message))?;
            Ok(Arc::new(adapter))
        }
    }
}
