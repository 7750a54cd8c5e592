//! Lookup and persistence boundaries for apps, clusters, and chart versions.
//!
//! The orchestrator only talks to the [`Catalog`] and [`ResourceStore`]
//! traits. [`FileCatalog`] is the bundled implementation: one YAML record per
//! entity under `<root>/catalog/`.
//!
//! Layout:
//!   catalog/
//!     apps/<app-id>.yaml
//!     clusters/<cluster-id>.yaml
//!     templates/<template-version-id>.yaml

use crate::error::{ActionError, Result};
use crate::types::{AppResource, Cluster, StateUpdate, TemplateVersion};
use crate::{io, paths};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Read side of the resource store. `Ok(None)` means the record does not exist.
pub trait Catalog: Send + Sync {
    fn app(&self, id: &str) -> Result<Option<AppResource>>;
    fn cluster(&self, id: &str) -> Result<Option<Cluster>>;
    fn template_version(&self, id: &str) -> Result<Option<TemplateVersion>>;
    fn list_apps(&self) -> Result<Vec<AppResource>>;
}

/// Write side of the resource store. Only the orchestrator calls this.
pub trait ResourceStore: Send + Sync {
    /// Apply `update` to the app and return the stored result.
    fn update(&self, app_id: &str, update: &StateUpdate) -> Result<AppResource>;
}

// ---------------------------------------------------------------------------
// FileCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
}

impl FileCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn put_app(&self, app: &AppResource) -> Result<()> {
        paths::validate_id(&app.id)?;
        write_record(&paths::app_path(&self.root, &app.id), app)
    }

    pub fn put_cluster(&self, cluster: &Cluster) -> Result<()> {
        paths::validate_id(&cluster.id)?;
        write_record(&paths::cluster_path(&self.root, &cluster.id), cluster)
    }

    pub fn put_template_version(&self, version: &TemplateVersion) -> Result<()> {
        paths::validate_id(&version.id)?;
        write_record(&paths::template_path(&self.root, &version.id), version)
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    Ok(Some(serde_yaml::from_str(&data)?))
}

fn write_record<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_yaml::to_string(value)?;
    io::atomic_write(path, data.as_bytes())
}

impl Catalog for FileCatalog {
    fn app(&self, id: &str) -> Result<Option<AppResource>> {
        paths::validate_id(id)?;
        read_record(&paths::app_path(&self.root, id))
    }

    fn cluster(&self, id: &str) -> Result<Option<Cluster>> {
        paths::validate_id(id)?;
        read_record(&paths::cluster_path(&self.root, id))
    }

    fn template_version(&self, id: &str) -> Result<Option<TemplateVersion>> {
        paths::validate_id(id)?;
        read_record(&paths::template_path(&self.root, id))
    }

    fn list_apps(&self) -> Result<Vec<AppResource>> {
        let dir = paths::apps_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut apps = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(app) = read_record::<AppResource>(&path)? {
                apps.push(app);
            }
        }
        apps.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(apps)
    }
}

impl ResourceStore for FileCatalog {
    fn update(&self, app_id: &str, update: &StateUpdate) -> Result<AppResource> {
        let fail = |message: String| ActionError::StateUpdate {
            app_id: app_id.to_string(),
            message,
        };

        let mut app = self
            .app(app_id)
            .map_err(|e| fail(e.to_string()))?
            .ok_or_else(|| fail("app no longer exists".into()))?;

        match update {
            StateUpdate::ExternalId(external_id) => app.external_id = external_id.clone(),
            StateUpdate::Resync(_) => {}
        }
        app.updated_at = Utc::now();

        self.put_app(&app).map_err(|e| fail(e.to_string()))?;
        tracing::debug!(app = %app_id, patch = %update.to_patch(), "app updated");
        Ok(app)
    }
}
