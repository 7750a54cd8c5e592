use crate::catalog::Catalog;
use crate::error::{ActionError, ResourceKind, Result};
use crate::types::TemplateVersion;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use url::Url;

const CHART_FILE: &str = "Chart.yaml";

/// Map an app's external id to the template version id it names.
///
/// `catalog://?catalog=library&template=mysql&version=0.3.4` becomes
/// `library-mysql-0.3.4`.
pub fn template_version_id(external_id: &str) -> Result<String> {
    let invalid = |why: &str| ActionError::InvalidRequest(format!("externalId '{external_id}' {why}"));

    let url = Url::parse(external_id).map_err(|e| invalid(&format!("is not a URL: {e}")))?;
    if url.scheme() != "catalog" {
        return Err(invalid("must use the catalog:// scheme"));
    }

    let (mut catalog, mut template, mut version) = (None, None, None);
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "catalog" => catalog = Some(value.into_owned()),
            "template" => template = Some(value.into_owned()),
            "version" => version = Some(value.into_owned()),
            _ => {}
        }
    }

    match (catalog, template, version) {
        (Some(c), Some(t), Some(v)) if !c.is_empty() && !t.is_empty() && !v.is_empty() => {
            Ok(format!("{c}-{t}-{v}"))
        }
        _ => Err(invalid("must name a catalog, template and version")),
    }
}

// ---------------------------------------------------------------------------
// ChartMaterializer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ChartMaterializer {
    catalog: Arc<dyn Catalog>,
}

impl ChartMaterializer {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Look up `version_id` and write its files under `workspace_root`.
    /// Returns the directory to hand to `helm upgrade`.
    pub fn materialize(&self, version_id: &str, workspace_root: &Path) -> Result<PathBuf> {
        let version = self
            .catalog
            .template_version(version_id)?
            .ok_or_else(|| ActionError::not_found(ResourceKind::TemplateVersion, version_id))?;
        stage(&version, workspace_root)
    }
}

/// Decode and write every file of `version` into a fresh `chart-<uuid>`
/// directory under `root`. Returns the directory holding the shallowest
/// `Chart.yaml`.
pub fn stage(version: &TemplateVersion, root: &Path) -> Result<PathBuf> {
    if version.files.is_empty() {
        return Err(ActionError::Provisioning(format!(
            "template version '{}' has no files",
            version.id
        )));
    }

    let files = version
        .files
        .iter()
        .map(|(name, content)| normalize(name).map(|rel| (name, rel, content)))
        .collect::<Result<Vec<_>>>()?;
    let chart_rel = chart_dir(files.iter().map(|(_, rel, _)| rel)).ok_or_else(|| {
        ActionError::Provisioning(format!(
            "template version '{}' has no {CHART_FILE}",
            version.id
        ))
    })?;

    let staging = root.join(format!("chart-{}", uuid::Uuid::new_v4().simple()));
    for (name, rel, content) in &files {
        let data = BASE64.decode(content.trim()).map_err(|e| {
            ActionError::Provisioning(format!("file '{name}' is not valid base64: {e}"))
        })?;

        let dest = staging.join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(parent, e))?;
        }
        std::fs::write(&dest, data).map_err(|e| write_failed(&dest, e))?;
    }

    let dir = if chart_rel.as_os_str().is_empty() {
        staging
    } else {
        staging.join(chart_rel)
    };
    tracing::debug!(
        version = %version.id,
        files = files.len(),
        dir = %dir.display(),
        "chart staged"
    );
    Ok(dir)
}

fn write_failed(path: &Path, e: std::io::Error) -> ActionError {
    ActionError::Provisioning(format!("failed to write {}: {e}", path.display()))
}

/// Keep only plain path segments; anything that could escape the staging
/// directory is rejected.
fn normalize(name: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ActionError::Provisioning(format!(
                    "chart file path '{name}' escapes the chart directory"
                )))
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(ActionError::Provisioning(format!(
            "chart file path '{name}' is empty"
        )));
    }
    Ok(out)
}

/// Directory (relative to the staging root) of the least nested
/// `Chart.yaml`. Ties go to the first path in name order.
fn chart_dir<'a>(files: impl Iterator<Item = &'a PathBuf>) -> Option<PathBuf> {
    files
        .filter(|f| f.file_name().is_some_and(|n| n == CHART_FILE))
        .min_by_key(|f| f.components().count())
        .map(|f| f.parent().map(Path::to_path_buf).unwrap_or_default())
}
