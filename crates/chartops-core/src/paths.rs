use crate::error::{ActionError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "chartops.yaml";
pub const CATALOG_DIR: &str = "catalog";
pub const APPS_DIR: &str = "catalog/apps";
pub const CLUSTERS_DIR: &str = "catalog/clusters";
pub const TEMPLATES_DIR: &str = "catalog/templates";

/// Credential file name inside an action workspace.
pub const KUBECONFIG_FILE: &str = ".kubeconfig";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn apps_dir(root: &Path) -> PathBuf {
    root.join(APPS_DIR)
}

pub fn app_path(root: &Path, id: &str) -> PathBuf {
    apps_dir(root).join(format!("{id}.yaml"))
}

pub fn cluster_path(root: &Path, id: &str) -> PathBuf {
    root.join(CLUSTERS_DIR).join(format!("{id}.yaml"))
}

pub fn template_path(root: &Path, id: &str) -> PathBuf {
    root.join(TEMPLATES_DIR).join(format!("{id}.yaml"))
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:\-]*$").unwrap())
}

/// Catalog ids become file names, so they must not contain separators.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 253 || !id_re().is_match(id) {
        return Err(ActionError::InvalidRequest(format!("invalid id '{id}'")));
    }
    Ok(())
}
