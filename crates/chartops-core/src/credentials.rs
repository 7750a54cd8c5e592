//! Per-action cluster credentials.
//!
//! A kubeconfig is built for the target cluster from the caller's token,
//! TLS verification is switched off on every cluster entry, and the result
//! is written to `<workspace>/.kubeconfig`. The file is only read by the
//! transient backend and helm and disappears with the workspace.

use crate::error::{ActionError, Result};
use crate::io::write_private;
use crate::paths::KUBECONFIG_FILE;
use crate::types::{AuthToken, Cluster};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// KubeConfig document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubeConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context", default)]
    pub current_context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterEntry {
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    pub user: UserEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub cluster: String,
    pub user: String,
}

impl KubeConfig {
    /// Single-cluster config: one cluster, one token user, one context, all
    /// named after the cluster id.
    pub fn single(name: &str, server: &str, ca_data: Option<String>, token: &str) -> Self {
        Self {
            api_version: "v1".into(),
            kind: "Config".into(),
            clusters: vec![NamedCluster {
                name: name.into(),
                cluster: ClusterEntry {
                    server: server.into(),
                    certificate_authority_data: ca_data,
                    insecure_skip_tls_verify: false,
                },
            }],
            users: vec![NamedUser {
                name: name.into(),
                user: UserEntry {
                    token: token.into(),
                },
            }],
            contexts: vec![NamedContext {
                name: name.into(),
                context: ContextEntry {
                    cluster: name.into(),
                    user: name.into(),
                },
            }],
            current_context: name.into(),
        }
    }

    /// Skip certificate verification on every cluster entry.
    ///
    /// CA data is dropped as well: kubectl-compatible clients refuse a
    /// cluster entry that sets both.
    pub fn relax_tls(&mut self) {
        for entry in &mut self.clusters {
            entry.cluster.insecure_skip_tls_verify = true;
            entry.cluster.certificate_authority_data = None;
        }
    }
}

// ---------------------------------------------------------------------------
// KubeConfigSource
// ---------------------------------------------------------------------------

/// Produces a kubeconfig for a cluster on behalf of a caller.
pub trait KubeConfigSource: Send + Sync {
    fn kube_config(&self, cluster: &Cluster, token: &AuthToken) -> Result<KubeConfig>;
}

/// Points straight at the cluster's API endpoint, authenticating with the
/// caller's token.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectKubeConfig;

impl KubeConfigSource for DirectKubeConfig {
    fn kube_config(&self, cluster: &Cluster, token: &AuthToken) -> Result<KubeConfig> {
        if cluster.api_endpoint.trim().is_empty() {
            return Err(ActionError::Credential(format!(
                "cluster '{}' has no API endpoint",
                cluster.id
            )));
        }
        if token.expose().is_empty() {
            return Err(ActionError::Credential("no auth token supplied".into()));
        }
        Ok(KubeConfig::single(
            &cluster.id,
            &cluster.api_endpoint,
            cluster.ca_cert.clone(),
            token.expose(),
        ))
    }
}

// ---------------------------------------------------------------------------
// CredentialProvisioner
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CredentialProvisioner {
    source: Arc<dyn KubeConfigSource>,
}

impl CredentialProvisioner {
    pub fn new(source: Arc<dyn KubeConfigSource>) -> Self {
        Self { source }
    }

    /// Write a relaxed-TLS kubeconfig for `cluster` into the workspace
    /// directory `dir` and return its path.
    pub fn provision(&self, cluster: &Cluster, token: &AuthToken, dir: &Path) -> Result<PathBuf> {
        let mut config = self
            .source
            .kube_config(cluster, token)
            .map_err(|e| match e {
                ActionError::Credential(_) => e,
                other => ActionError::Credential(other.to_string()),
            })?;
        config.relax_tls();

        let data = serde_yaml::to_string(&config)
            .map_err(|e| ActionError::Credential(format!("failed to encode kubeconfig: {e}")))?;

        let path = dir.join(KUBECONFIG_FILE);
        write_private(&path, data.as_bytes()).map_err(|e| {
            ActionError::Credential(format!("failed to write {}: {e}", path.display()))
        })?;

        tracing::debug!(cluster = %cluster.id, path = %path.display(), "kubeconfig written");
        Ok(path)
    }
}
