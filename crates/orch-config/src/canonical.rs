//! Canonical-JSON hashing, used both for the `requestHash` idempotency
//! protocol and for layered repo-config loading. Adapted from the
//! deep-merge/sort-keys/hash pipeline used to fingerprint layered YAML
//! configs: objects are recursively key-sorted before hashing so semantically
//! identical payloads always hash identically regardless of field order.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Recursively sort object keys so two structurally-equal JSON values always
/// serialize to the same bytes.
pub fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

pub fn canonicalize_json(v: &Value) -> String {
    serde_json::to_string(&sort_keys(v)).expect("json serialization must not fail")
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// `requestHash = SHA256(canonicalJSON{repoOwner,repoName,issueNumber,goal,requestor,prMode})`
/// (spec §4.1). `value` must already be the submission's canonical field set.
pub fn request_hash<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value).context("serialize submission for request hash")?;
    let canonical = canonicalize_json(&json);
    Ok(sha256_hex(canonical.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load + deep-merge YAML files in order (later overrides earlier), then
/// canonicalize and hash the result. Used for optional per-repo config
/// overlays (`Repo.configPath`).
pub fn load_layered_yaml(paths: &[impl AsRef<Path>]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let p = p.as_ref();
        let s = fs::read_to_string(p).with_context(|| format!("read config: {}", p.display()))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {}", p.display()))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);
    let config_hash = sha256_hex(canonical.as_bytes());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash,
    })
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}
