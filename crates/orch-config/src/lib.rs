//! Configuration and canonical-hashing helpers shared by the control plane,
//! execution engine, and CLI binaries.

pub mod canonical;
pub mod env;

pub use canonical::{canonicalize_json, load_layered_yaml, request_hash, sha256_hex, sort_keys, LoadedConfig};
pub use env::{bootstrap_dotenv, CoderunnerConfig, ControlPlaneConfig, ExecutionEngineConfig};
