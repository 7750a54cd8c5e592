use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ToolsConfig
// ---------------------------------------------------------------------------

/// Executables used for an action. Bare names are resolved on `PATH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_helm")]
    pub helm: String,
    #[serde(default = "default_tiller")]
    pub tiller: String,
}

fn default_helm() -> String {
    "helm".to_string()
}

fn default_tiller() -> String {
    "tiller".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            helm: default_helm(),
            tiller: default_tiller(),
        }
    }
}

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Poll the backend's health port before running helm.
    #[serde(default = "default_wait_for_ready")]
    pub wait_for_ready: bool,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Value of `TILLER_HISTORY_MAX`.
    #[serde(default = "default_history_max")]
    pub history_max: u32,
}

fn default_wait_for_ready() -> bool {
    true
}

fn default_ready_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_history_max() -> u32 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            wait_for_ready: default_wait_for_ready(),
            ready_timeout_secs: default_ready_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            history_max: default_history_max(),
        }
    }
}

impl BackendConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

// ---------------------------------------------------------------------------
// WorkspaceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory that action workspaces are created in. System temp dir if unset.
    #[serde(default)]
    pub parent: Option<PathBuf>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "helm-".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            parent: None,
            prefix: default_prefix(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

impl Config {
    /// Load `chartops.yaml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (label, bin) in [("helm", &self.tools.helm), ("tiller", &self.tools.tiller)] {
            if bin.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("tools.{label} is empty"),
                });
            } else if which::which(bin).is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("tools.{label} '{bin}' was not found on PATH"),
                });
            }
        }

        if self.backend.wait_for_ready && self.backend.ready_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "backend.ready_timeout_secs must be positive when wait_for_ready is set"
                    .to_string(),
            });
        }

        if self.backend.history_max == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "backend.history_max is 0: rollback will have no revisions to target"
                    .to_string(),
            });
        }

        if self.workspace.prefix.contains(['/', '\\']) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "workspace.prefix '{}' must not contain a path separator",
                    self.workspace.prefix
                ),
            });
        }

        if let Some(parent) = &self.workspace.parent {
            if !parent.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("workspace.parent '{}' is not a directory", parent.display()),
                });
            }
        }

        warnings
    }
}
