use chartops_core::catalog::FileCatalog;
use chartops_core::config::Config;
use chartops_core::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(root: PathBuf, orchestrator: Orchestrator) -> Self {
        Self {
            root,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// State backed by the file catalog and `chartops.yaml` under `root`.
    pub fn from_root(root: PathBuf) -> chartops_core::Result<Self> {
        let config = Config::load(&root)?;
        for w in config.validate() {
            tracing::warn!("config: {}", w.message);
        }
        let orchestrator = Orchestrator::with_file_catalog(&config, FileCatalog::new(&root));
        Ok(Self::new(root, orchestrator))
    }
}
