//! Upgrade and rollback of an app's Helm release.
//!
//! One call to [`Orchestrator::execute`] acquires, in order: a workspace, a
//! kubeconfig inside it, two loopback ports, and a tiller backend. It then
//! runs helm and records the result on the app. Resources are released in
//! reverse order on every path: the backend is stopped before the workspace
//! holding its kubeconfig is removed.
//!
//! Upgrade writes the requested `externalId` before helm runs and writes it
//! again once helm succeeds. A failed helm run leaves the first write in
//! place.
//!
//! Catalog lookups, store writes, and credential and chart files go through
//! `spawn_blocking`; only helm and the backend run on the async workers.

use crate::backend::{BackendSpec, BackendSupervisor};
use crate::catalog::{Catalog, FileCatalog, ResourceStore};
use crate::chart::{self, ChartMaterializer};
use crate::config::{Config, ToolsConfig, WorkspaceConfig};
use crate::credentials::{CredentialProvisioner, DirectKubeConfig, KubeConfigSource};
use crate::error::{ActionError, ResourceKind, Result};
use crate::helm;
use crate::ports::{self, BackendPorts};
use crate::process::{ProcessRunner, TokioProcessRunner};
use crate::types::{Action, ActionRequest, AppResource, AuthToken, Cluster, StateUpdate};
use crate::workspace::Workspace;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct Orchestrator {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ResourceStore>,
    credentials: CredentialProvisioner,
    charts: ChartMaterializer,
    backend: BackendSupervisor,
    runner: Arc<dyn ProcessRunner>,
    tools: ToolsConfig,
    workspace: WorkspaceConfig,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ResourceStore>,
        kube_configs: Arc<dyn KubeConfigSource>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            credentials: CredentialProvisioner::new(kube_configs),
            charts: ChartMaterializer::new(Arc::clone(&catalog)),
            backend: BackendSupervisor::new(
                Arc::clone(&runner),
                config.tools.clone(),
                config.backend.clone(),
            ),
            catalog,
            store,
            runner,
            tools: config.tools.clone(),
            workspace: config.workspace.clone(),
        }
    }

    /// Orchestrator over a [`FileCatalog`], talking to clusters directly and
    /// running real helm/tiller binaries.
    pub fn with_file_catalog(config: &Config, catalog: FileCatalog) -> Self {
        let catalog = Arc::new(catalog);
        Self::new(
            config,
            catalog.clone(),
            catalog,
            Arc::new(DirectKubeConfig),
            Arc::new(TokioProcessRunner),
        )
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Run `request` against its app and return the app as last written.
    pub async fn execute(&self, request: &ActionRequest, token: &AuthToken) -> Result<AppResource> {
        let catalog = Arc::clone(&self.catalog);
        let app_id = request.app_id.clone();
        let (app, cluster) = blocking(move || {
            let app = catalog
                .app(&app_id)?
                .ok_or_else(|| ActionError::not_found(ResourceKind::App, &app_id))?;
            let cluster = catalog
                .cluster(app.cluster_id())?
                .ok_or_else(|| ActionError::not_found(ResourceKind::Cluster, app.cluster_id()))?;
            Ok((app, cluster))
        })
        .await?;

        tracing::info!(
            app = %app.id,
            release = %app.name,
            cluster = %cluster.id,
            action = %request.action,
            "action started"
        );

        let config = self.workspace.clone();
        let workspace = blocking(move || Workspace::create(&config)).await?;
        let outcome = self
            .in_workspace(workspace.path(), &app, cluster, &request.action, token)
            .await;

        if let Err(e) = blocking(move || workspace.close()).await {
            if outcome.is_ok() {
                return Err(e);
            }
            tracing::warn!("{e}");
        }

        match &outcome {
            Ok(_) => tracing::info!(app = %app.id, action = %request.action, "action succeeded"),
            Err(e) => {
                tracing::warn!(app = %app.id, action = %request.action, error = %e, "action failed")
            }
        }
        outcome
    }

    async fn in_workspace(
        &self,
        dir: &Path,
        app: &AppResource,
        cluster: Cluster,
        action: &Action,
        token: &AuthToken,
    ) -> Result<AppResource> {
        let credentials = self.credentials.clone();
        let (token, ws_dir) = (token.clone(), dir.to_path_buf());
        let kubeconfig =
            blocking(move || credentials.provision(&cluster, &token, &ws_dir)).await?;

        let backend = self
            .backend
            .start(BackendSpec {
                ports: ports::allocate()?,
                namespace: app.install_namespace.clone(),
                kubeconfig: kubeconfig.clone(),
            })
            .await?;

        let outcome = match action {
            Action::Upgrade { external_id } => {
                self.upgrade(app, external_id, backend.ports(), &kubeconfig, dir)
                    .await
            }
            Action::Rollback { revision } => {
                self.rollback(app, revision, backend.ports(), &kubeconfig)
                    .await
            }
        };

        backend.stop().await;
        outcome
    }

    async fn upgrade(
        &self,
        app: &AppResource,
        external_id: &str,
        ports: BackendPorts,
        kubeconfig: &Path,
        dir: &Path,
    ) -> Result<AppResource> {
        let update = StateUpdate::ExternalId(external_id.to_string());
        self.apply(&app.id, update.clone()).await?;

        let version_id = chart::template_version_id(external_id)?;
        let charts = self.charts.clone();
        let ws_dir = dir.to_path_buf();
        let chart_dir = blocking(move || charts.materialize(&version_id, &ws_dir)).await?;

        self.runner
            .run(&helm::upgrade(
                &self.tools,
                ports,
                kubeconfig,
                &app.name,
                &chart_dir,
            ))
            .await?;

        self.apply(&app.id, update).await
    }

    async fn rollback(
        &self,
        app: &AppResource,
        revision: &str,
        ports: BackendPorts,
        kubeconfig: &Path,
    ) -> Result<AppResource> {
        self.runner
            .run(&helm::rollback(
                &self.tools,
                ports,
                kubeconfig,
                &app.name,
                revision,
            ))
            .await?;

        self.apply(&app.id, StateUpdate::Resync(app.id.clone()))
            .await
    }

    async fn apply(&self, app_id: &str, update: StateUpdate) -> Result<AppResource> {
        let store = Arc::clone(&self.store);
        let id = app_id.to_string();
        blocking(move || store.update(&id, &update))
            .await
            .map_err(|e| match e {
                ActionError::StateUpdate { .. } => e,
                other => ActionError::StateUpdate {
                    app_id: app_id.to_string(),
                    message: other.to_string(),
                },
            })
    }
}

/// Run catalog, store and filesystem work on the blocking pool so it never
/// stalls the runtime's workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ActionError::Provisioning(format!("blocking task failed: {e}")))?
}
