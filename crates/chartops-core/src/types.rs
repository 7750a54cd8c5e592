use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Action requests
// ---------------------------------------------------------------------------

/// The lifecycle operation requested for an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Upgrade { external_id: String },
    Rollback { revision: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Upgrade { .. } => "upgrade",
            Action::Rollback { .. } => "rollback",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub app_id: String,
    pub action: Action,
}

impl ActionRequest {
    pub fn upgrade(app_id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            action: Action::Upgrade {
                external_id: external_id.into(),
            },
        }
    }

    pub fn rollback(app_id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            action: Action::Rollback {
                revision: revision.into(),
            },
        }
    }
}

/// Body of `POST .../upgrade`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeInput {
    pub external_id: String,
}

/// Body of `POST .../rollback`. The revision may arrive as a JSON string or number.
#[derive(Debug, Clone, Deserialize)]
pub struct RollbackInput {
    #[serde(deserialize_with = "string_or_number")]
    pub revision: String,
}

fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Catalog records
// ---------------------------------------------------------------------------

/// A deployed application (Helm release) as held by the resource store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppResource {
    pub id: String,
    /// `<cluster-id>:<project-id>`.
    pub project_id: String,
    pub install_namespace: String,
    /// Release name.
    pub name: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl AppResource {
    /// The owning cluster is the prefix of the project id.
    pub fn cluster_id(&self) -> &str {
        self.project_id
            .split_once(':')
            .map_or(self.project_id.as_str(), |(cluster, _)| cluster)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub api_endpoint: String,
    /// Base64-encoded PEM bundle.
    #[serde(default)]
    pub ca_cert: Option<String>,
}

/// A chart version: path to base64-encoded file content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub id: String,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// State updates
// ---------------------------------------------------------------------------

/// A write the orchestrator asks the resource store to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    /// Record the chart the app is (about to be) running.
    ExternalId(String),
    /// Touch the resource so downstream controllers resync. Carries the app id.
    Resync(String),
}

impl StateUpdate {
    /// Wire form of the update, as sent to a REST resource store.
    pub fn to_patch(&self) -> serde_json::Value {
        match self {
            StateUpdate::ExternalId(id) => serde_json::json!({ "externalId": id }),
            StateUpdate::Resync(app_id) => serde_json::json!({ "name": app_id }),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthToken
// ---------------------------------------------------------------------------

/// The caller's bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}
