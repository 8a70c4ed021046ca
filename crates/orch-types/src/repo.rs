use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered dispatch target repository. Unique on `(owner, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub config_path: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repo {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Inputs for `register_repo`. `default_branch` defaults to `"main"` and
/// `enabled` defaults to `true` when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRepo {
    pub owner: String,
    pub name: String,
    pub default_branch: Option<String>,
    pub config_path: Option<String>,
    pub enabled: Option<bool>,
}

pub const DEFAULT_BRANCH: &str = "main";
